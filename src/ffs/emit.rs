//! Overpass QL rendering.
//!
//! One statement per clause per element type, clause-major, wrapped in a
//! single union block with the fixed output trailer. The `(bbox)` region
//! suffix is a placeholder the caller substitutes with real coordinates at
//! request time.

use super::ast::{Clause, Condition, ConditionKind, ElementType, MetaCondition, Pattern, RegionSpec};

const TRAILER: &str = "out body;>;out skel qt;";

/// Render the expanded clauses into a complete query.
///
/// The region is passed alongside the clauses so an area prelude is still
/// emitted when every clause was dropped as vacuous.
pub fn emit(clauses: &[Clause], region: &RegionSpec) -> String {
    let mut out = String::new();

    if let RegionSpec::Area(name) = region {
        out.push_str(&format!("area({name})->.searchArea;\n"));
    }

    out.push('(');
    for clause in clauses {
        for element in clause.types.iter() {
            emit_statement(&mut out, clause, element);
        }
    }
    out.push_str(");");
    out.push_str(TRAILER);
    out
}

fn emit_statement(out: &mut String, clause: &Clause, element: ElementType) {
    out.push_str(element.keyword());
    for cond in &clause.conditions {
        render_bracket(out, cond);
    }
    for meta in &clause.qualifiers {
        render_qualifier(out, meta);
    }
    match &clause.region {
        RegionSpec::Bbox => out.push_str("(bbox)"),
        RegionSpec::Area(_) => out.push_str("(area.searchArea)"),
        RegionSpec::Around { name, radius } => {
            out.push_str(&format!("(around:{radius},coords:{name})"));
        }
        RegionSpec::Global => {}
    }
    out.push(';');
}

/// One `[…]` tag filter.
fn render_bracket(out: &mut String, cond: &Condition) {
    out.push('[');
    if cond.key.is_regex() {
        out.push('~');
    }
    render_pattern(out, &cond.key);

    match cond.kind {
        ConditionKind::HasKey => {}
        ConditionKind::LacksKey => out.push_str("!~\".*\""),
        ConditionKind::Equals => {
            out.push('=');
            render_pattern(out, &cond.value);
        }
        ConditionKind::NotEquals => {
            out.push_str("!=");
            render_pattern(out, &cond.value);
        }
        ConditionKind::RegexMatch | ConditionKind::Substring => {
            out.push('~');
            render_pattern(out, &cond.value);
        }
        ConditionKind::NotRegexMatch => {
            out.push_str("!~");
            render_pattern(out, &cond.value);
        }
    }

    if cond.case_insensitive {
        out.push_str(",i");
    }
    out.push(']');
}

fn render_pattern(out: &mut String, pattern: &Pattern) {
    out.push('"');
    match pattern {
        Pattern::Literal(s) => out.push_str(&escape_literal(s)),
        Pattern::Regex(s) => out.push_str(&escape_regex(s)),
    }
    out.push('"');
}

fn render_qualifier(out: &mut String, meta: &MetaCondition) {
    match meta {
        // Type filters are folded into the clause's type set, never kept
        // as qualifiers.
        MetaCondition::Type(_) => {}
        MetaCondition::Newer(ts) => out.push_str(&format!("(newer:\"{ts}\")")),
        MetaCondition::User(name) => {
            out.push_str(&format!("(user:\"{}\")", escape_literal(name)));
        }
        MetaCondition::Uid(n) => out.push_str(&format!("(uid:{n})")),
        MetaCondition::Id(n) => out.push_str(&format!("(id:{n})")),
    }
}

/// Escape a literal for a quoted string: backslash, quote, and control
/// characters become their two-character forms.
fn escape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

/// Escape a regex source for a quoted string. Backslashes stay single so
/// the pattern reaches the regex engine unchanged.
fn escape_regex(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffs::ast::TypeSet;

    fn equals(key: &str, value: &str) -> Condition {
        Condition {
            key: Pattern::Literal(key.into()),
            kind: ConditionKind::Equals,
            value: Pattern::Literal(value.into()),
            case_insensitive: false,
        }
    }

    fn clause(conditions: Vec<Condition>, region: RegionSpec) -> Clause {
        Clause {
            conditions,
            types: TypeSet::ALL,
            qualifiers: Vec::new(),
            region,
        }
    }

    #[test]
    fn test_single_clause_all_types() {
        let query = emit(
            &[clause(vec![equals("foo", "bar")], RegionSpec::Bbox)],
            &RegionSpec::Bbox,
        );
        assert_eq!(
            query,
            "(node[\"foo\"=\"bar\"](bbox);way[\"foo\"=\"bar\"](bbox);\
             relation[\"foo\"=\"bar\"](bbox););out body;>;out skel qt;"
        );
    }

    #[test]
    fn test_empty_union() {
        assert_eq!(emit(&[], &RegionSpec::Bbox), "();out body;>;out skel qt;");
    }

    #[test]
    fn test_empty_union_still_gets_area_prelude() {
        assert_eq!(
            emit(&[], &RegionSpec::Area("myarea".into())),
            "area(myarea)->.searchArea;\n();out body;>;out skel qt;"
        );
    }

    #[test]
    fn test_area_region() {
        let region = RegionSpec::Area("myarea".into());
        let query = emit(
            &[Clause {
                conditions: vec![equals("foo", "bar")],
                types: TypeSet::only(ElementType::Node),
                qualifiers: Vec::new(),
                region: region.clone(),
            }],
            &region,
        );
        assert_eq!(
            query,
            "area(myarea)->.searchArea;\n\
             (node[\"foo\"=\"bar\"](area.searchArea););out body;>;out skel qt;"
        );
    }

    #[test]
    fn test_around_region() {
        let region = RegionSpec::Around {
            name: "Main Station".into(),
            radius: 250,
        };
        let query = emit(
            &[Clause {
                conditions: vec![equals("foo", "bar")],
                types: TypeSet::only(ElementType::Node),
                qualifiers: Vec::new(),
                region: region.clone(),
            }],
            &region,
        );
        assert_eq!(
            query,
            "(node[\"foo\"=\"bar\"](around:250,coords:Main Station););out body;>;out skel qt;"
        );
    }

    #[test]
    fn test_global_region_has_no_suffix() {
        let query = emit(
            &[Clause {
                conditions: vec![equals("foo", "bar")],
                types: TypeSet::only(ElementType::Way),
                qualifiers: Vec::new(),
                region: RegionSpec::Global,
            }],
            &RegionSpec::Global,
        );
        assert_eq!(query, "(way[\"foo\"=\"bar\"];);out body;>;out skel qt;");
    }

    #[test]
    fn test_existence_brackets() {
        let has = Condition {
            key: Pattern::Literal("name".into()),
            kind: ConditionKind::HasKey,
            value: Pattern::Literal(String::new()),
            case_insensitive: false,
        };
        let lacks = Condition {
            key: Pattern::Literal("name".into()),
            kind: ConditionKind::LacksKey,
            value: Pattern::Literal(String::new()),
            case_insensitive: false,
        };
        let query = emit(
            &[Clause {
                conditions: vec![has, lacks],
                types: TypeSet::only(ElementType::Node),
                qualifiers: Vec::new(),
                region: RegionSpec::Global,
            }],
            &RegionSpec::Global,
        );
        assert_eq!(
            query,
            "(node[\"name\"][\"name\"!~\".*\"];);out body;>;out skel qt;"
        );
    }

    #[test]
    fn test_regex_key_bracket() {
        let cond = Condition {
            key: Pattern::Regex("^$".into()),
            kind: ConditionKind::RegexMatch,
            value: Pattern::Regex("^bar$".into()),
            case_insensitive: false,
        };
        let query = emit(
            &[Clause {
                conditions: vec![cond],
                types: TypeSet::only(ElementType::Node),
                qualifiers: Vec::new(),
                region: RegionSpec::Global,
            }],
            &RegionSpec::Global,
        );
        assert_eq!(query, "(node[~\"^$\"~\"^bar$\"];);out body;>;out skel qt;");
    }

    #[test]
    fn test_case_insensitive_flag() {
        let cond = Condition {
            key: Pattern::Literal("name".into()),
            kind: ConditionKind::RegexMatch,
            value: Pattern::Regex("^berlin".into()),
            case_insensitive: true,
        };
        let query = emit(
            &[Clause {
                conditions: vec![cond],
                types: TypeSet::only(ElementType::Node),
                qualifiers: Vec::new(),
                region: RegionSpec::Global,
            }],
            &RegionSpec::Global,
        );
        assert_eq!(
            query,
            "(node[\"name\"~\"^berlin\",i];);out body;>;out skel qt;"
        );
    }

    #[test]
    fn test_qualifiers_render_between_tags_and_region() {
        let query = emit(
            &[Clause {
                conditions: vec![equals("foo", "bar")],
                types: TypeSet::only(ElementType::Node),
                qualifiers: vec![
                    MetaCondition::Newer("2024-05-01T00:00:00Z".into()),
                    MetaCondition::User("alice".into()),
                    MetaCondition::Uid(4042),
                    MetaCondition::Id(123),
                ],
                region: RegionSpec::Bbox,
            }],
            &RegionSpec::Bbox,
        );
        assert_eq!(
            query,
            "(node[\"foo\"=\"bar\"](newer:\"2024-05-01T00:00:00Z\")\
             (user:\"alice\")(uid:4042)(id:123)(bbox););out body;>;out skel qt;"
        );
    }

    #[test]
    fn test_literal_escaping() {
        let query = emit(
            &[Clause {
                conditions: vec![equals("name", "say \"hi\"\tnow\\")],
                types: TypeSet::only(ElementType::Node),
                qualifiers: Vec::new(),
                region: RegionSpec::Global,
            }],
            &RegionSpec::Global,
        );
        assert_eq!(
            query,
            "(node[\"name\"=\"say \\\"hi\\\"\\tnow\\\\\"];);out body;>;out skel qt;"
        );
    }

    #[test]
    fn test_regex_backslashes_stay_single() {
        let cond = Condition {
            key: Pattern::Literal("foo".into()),
            kind: ConditionKind::RegexMatch,
            value: Pattern::Regex("\\*".into()),
            case_insensitive: false,
        };
        let query = emit(
            &[Clause {
                conditions: vec![cond],
                types: TypeSet::only(ElementType::Node),
                qualifiers: Vec::new(),
                region: RegionSpec::Global,
            }],
            &RegionSpec::Global,
        );
        assert_eq!(query, "(node[\"foo\"~\"\\*\"];);out body;>;out skel qt;");
    }

    #[test]
    fn test_clause_major_statement_order() {
        let query = emit(
            &[
                clause(vec![equals("a", "1")], RegionSpec::Bbox),
                clause(vec![equals("b", "2")], RegionSpec::Bbox),
            ],
            &RegionSpec::Bbox,
        );
        let positions: Vec<usize> = ["node[\"a\"", "way[\"a\"", "relation[\"a\"", "node[\"b\""]
            .iter()
            .map(|needle| query.find(*needle).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
