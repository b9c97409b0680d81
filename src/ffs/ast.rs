//! AST types for the free-form search language.

/// A key or value as written: literal text or a regular expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Literal(String),
    Regex(String),
}

impl Pattern {
    pub fn is_empty(&self) -> bool {
        match self {
            Pattern::Literal(s) | Pattern::Regex(s) => s.is_empty(),
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Pattern::Regex(_))
    }
}

/// How a tag condition tests key against value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    /// `key=*` (tag exists)
    HasKey,
    /// `key!=*` (tag does not exist)
    LacksKey,
    /// `key=value`
    Equals,
    /// `key!=value`
    NotEquals,
    /// `key~regex`
    RegexMatch,
    /// `key!~regex`
    NotRegexMatch,
    /// `key:value` (substring; normalization rewrites this to RegexMatch)
    Substring,
}

/// An atomic tag test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub key: Pattern,
    pub kind: ConditionKind,
    pub value: Pattern,
    /// Case-insensitive matching, from the `i` regex modifier.
    pub case_insensitive: bool,
}

/// OSM element types, in the order statements are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Node,
    Way,
    Relation,
}

impl ElementType {
    pub fn keyword(&self) -> &'static str {
        match self {
            ElementType::Node => "node",
            ElementType::Way => "way",
            ElementType::Relation => "relation",
        }
    }
}

/// The element types a clause may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSet {
    pub node: bool,
    pub way: bool,
    pub relation: bool,
}

impl TypeSet {
    pub const ALL: TypeSet = TypeSet {
        node: true,
        way: true,
        relation: true,
    };

    pub const NONE: TypeSet = TypeSet {
        node: false,
        way: false,
        relation: false,
    };

    pub fn only(t: ElementType) -> Self {
        let mut set = TypeSet::NONE;
        match t {
            ElementType::Node => set.node = true,
            ElementType::Way => set.way = true,
            ElementType::Relation => set.relation = true,
        }
        set
    }

    pub fn union(self, other: TypeSet) -> TypeSet {
        TypeSet {
            node: self.node || other.node,
            way: self.way || other.way,
            relation: self.relation || other.relation,
        }
    }

    pub fn intersect(self, other: TypeSet) -> TypeSet {
        TypeSet {
            node: self.node && other.node,
            way: self.way && other.way,
            relation: self.relation && other.relation,
        }
    }

    pub fn is_empty(self) -> bool {
        !(self.node || self.way || self.relation)
    }

    pub fn count(self) -> usize {
        usize::from(self.node) + usize::from(self.way) + usize::from(self.relation)
    }

    /// Iterate the set in fixed node, way, relation order.
    pub fn iter(self) -> impl Iterator<Item = ElementType> {
        [
            (self.node, ElementType::Node),
            (self.way, ElementType::Way),
            (self.relation, ElementType::Relation),
        ]
        .into_iter()
        .filter_map(|(present, t)| present.then_some(t))
    }
}

/// A non-tag filter. `Type` narrows the clause's element-type set; the
/// rest attach to the clause as statement-level qualifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCondition {
    Type(ElementType),
    /// RFC 3339 timestamp, normalized at parse time.
    Newer(String),
    User(String),
    Uid(u64),
    Id(u64),
}

/// How results are spatially scoped. One region applies to the whole
/// query; it is parsed off the end of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionSpec {
    /// Current bounding box; emitted as the `(bbox)` placeholder.
    Bbox,
    /// A named area, geocoded by the caller via `area(<name>)`.
    Area(String),
    /// A radius in meters around a named place.
    Around { name: String, radius: u32 },
    /// No spatial restriction at all.
    Global,
}

impl Default for RegionSpec {
    fn default() -> Self {
        RegionSpec::Bbox
    }
}

/// Boolean filter expression. `and` binds tighter than `or`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Condition(Condition),
    Meta(MetaCondition),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
}

impl Expression {
    pub fn and(left: Expression, right: Expression) -> Expression {
        Expression::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Expression, right: Expression) -> Expression {
        Expression::Or(Box::new(left), Box::new(right))
    }
}

/// One conjunction of the disjunctive normal form: the tag conditions,
/// the surviving element types, non-type qualifiers, and the region.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub conditions: Vec<Condition>,
    pub types: TypeSet,
    pub qualifiers: Vec<MetaCondition>,
    pub region: RegionSpec,
}
