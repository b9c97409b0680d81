//! Parser for the free-form search language.
//!
//! Grammar (in rough EBNF):
//!
//! query      = term region? | or_expr region?
//! term       = (WORD | QUOTED)+        (resolved against the preset catalog)
//! region     = "in" "bbox" | "in" name | "around" name | "global"
//! or_expr    = and_expr (OR and_expr)*
//! and_expr   = primary (AND primary)*
//! primary    = "(" or_expr ")" | meta_cond | tag_cond
//! meta_cond  = ("type" | "newer" | "user" | "uid" | "id") ":" value
//! tag_cond   = key ("=" | "!=") (value | "*")
//!            | key ("~" | "!~") rvalue
//!            | key ":" (value | REGEX)
//! key        = WORD | QUOTED
//! value      = WORD | QUOTED
//! rvalue     = WORD | QUOTED | REGEX
//! name       = "bbox" | (WORD | QUOTED)+
//!
//! The region qualifier is stripped off the end of the token stream before
//! anything else; the rest of the input is then either a bare term (no
//! operators anywhere) or a boolean expression.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::CompileOptions;
use super::ast::{
    Condition, ConditionKind, ElementType, Expression, MetaCondition, Pattern, RegionSpec,
};
use super::lexer::{Token, tokenize};
use crate::error::CompileError;

/// What the non-region part of the input turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryBody {
    /// The whole input was bare words, to be resolved as a preset name.
    Freeform(String),
    /// A boolean filter expression.
    Expression(Expression),
}

/// Parse result: the query body plus the region stripped off its end.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    pub body: QueryBody,
    pub region: RegionSpec,
}

/// Parser state.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

/// The meta-condition keywords, recognized only as bare words followed by `:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetaKeyword {
    Type,
    Newer,
    User,
    Uid,
    Id,
}

impl MetaKeyword {
    fn name(self) -> &'static str {
        match self {
            MetaKeyword::Type => "type",
            MetaKeyword::Newer => "newer",
            MetaKeyword::User => "user",
            MetaKeyword::Uid => "uid",
            MetaKeyword::Id => "id",
        }
    }
}

fn meta_keyword(word: &str) -> Option<MetaKeyword> {
    match word {
        "type" => Some(MetaKeyword::Type),
        "newer" => Some(MetaKeyword::Newer),
        "user" => Some(MetaKeyword::User),
        "uid" => Some(MetaKeyword::Uid),
        "id" => Some(MetaKeyword::Id),
        _ => None,
    }
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: Token) -> Result<(), CompileError> {
        let tok = self.advance();
        if tok == expected {
            Ok(())
        } else {
            Err(CompileError::syntax(format!(
                "expected {expected:?}, got {tok:?}"
            )))
        }
    }

    /// Parse OR expression: and_expr (OR and_expr)*
    fn parse_or_expr(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_and_expr()?;

        while matches!(self.peek(), Token::Or) {
            self.advance(); // consume or
            let right = self.parse_and_expr()?;
            left = Expression::or(left, right);
        }

        Ok(left)
    }

    /// Parse AND expression: primary (AND primary)*
    fn parse_and_expr(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_primary()?;

        while matches!(self.peek(), Token::And) {
            self.advance(); // consume and
            let right = self.parse_primary()?;
            left = Expression::and(left, right);
        }

        Ok(left)
    }

    /// Parse primary expression: "(" or_expr ")" | meta_cond | tag_cond
    fn parse_primary(&mut self) -> Result<Expression, CompileError> {
        match self.peek().clone() {
            Token::LParen => {
                self.advance(); // consume (
                let inner = self.parse_or_expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Word(w) => {
                // `type:node` is a meta condition, `"type":node` is a
                // substring match on the tag key `type`.
                match meta_keyword(&w) {
                    Some(kind) if matches!(self.tokens.get(self.pos + 1), Some(Token::Colon)) => {
                        self.parse_meta(kind)
                    }
                    _ => self.parse_condition(),
                }
            }
            Token::Quoted(_) => self.parse_condition(),
            other => Err(CompileError::syntax(format!("unexpected token: {other:?}"))),
        }
    }

    /// Parse a meta condition, keyword and colon still unconsumed.
    fn parse_meta(&mut self, kind: MetaKeyword) -> Result<Expression, CompileError> {
        self.advance(); // consume keyword
        self.advance(); // consume :

        let value = match self.advance() {
            Token::Word(s) | Token::Quoted(s) => s,
            other => {
                return Err(CompileError::syntax(format!(
                    "expected a value after '{}:', got {other:?}",
                    kind.name()
                )));
            }
        };

        let meta = match kind {
            MetaKeyword::Type => match value.as_str() {
                "node" => MetaCondition::Type(ElementType::Node),
                "way" => MetaCondition::Type(ElementType::Way),
                "relation" => MetaCondition::Type(ElementType::Relation),
                other => {
                    return Err(CompileError::syntax(format!(
                        "'type:' expects node, way or relation, got '{other}'"
                    )));
                }
            },
            MetaKeyword::Newer => MetaCondition::Newer(normalize_timestamp(&value)?),
            MetaKeyword::User => MetaCondition::User(value),
            MetaKeyword::Uid => MetaCondition::Uid(parse_number(&value, MetaKeyword::Uid)?),
            MetaKeyword::Id => MetaCondition::Id(parse_number(&value, MetaKeyword::Id)?),
        };
        Ok(Expression::Meta(meta))
    }

    /// Parse a tag condition: key, comparison operator, value.
    fn parse_condition(&mut self) -> Result<Expression, CompileError> {
        let key = match self.advance() {
            Token::Word(s) | Token::Quoted(s) => Pattern::Literal(s),
            other => {
                return Err(CompileError::syntax(format!(
                    "expected a tag key, got {other:?}"
                )));
            }
        };

        let op = self.advance();
        let cond = match op {
            Token::Eq | Token::Neq => {
                let negated = op == Token::Neq;
                match self.advance() {
                    Token::Star => Condition {
                        key,
                        kind: if negated {
                            ConditionKind::LacksKey
                        } else {
                            ConditionKind::HasKey
                        },
                        value: Pattern::Literal(String::new()),
                        case_insensitive: false,
                    },
                    Token::Word(s) | Token::Quoted(s) => Condition {
                        key,
                        kind: if negated {
                            ConditionKind::NotEquals
                        } else {
                            ConditionKind::Equals
                        },
                        value: Pattern::Literal(s),
                        case_insensitive: false,
                    },
                    other => {
                        return Err(CompileError::syntax(format!(
                            "expected a value or '*' after {op:?}, got {other:?}"
                        )));
                    }
                }
            }
            Token::Tilde | Token::NotTilde => {
                let kind = if op == Token::NotTilde {
                    ConditionKind::NotRegexMatch
                } else {
                    ConditionKind::RegexMatch
                };
                let (value, case_insensitive) = match self.advance() {
                    Token::Word(s) | Token::Quoted(s) => (Pattern::Regex(s), false),
                    Token::Regex {
                        source,
                        case_insensitive,
                    } => (Pattern::Regex(source), case_insensitive),
                    other => {
                        return Err(CompileError::syntax(format!(
                            "expected a regex after {op:?}, got {other:?}"
                        )));
                    }
                };
                Condition {
                    key,
                    kind,
                    value,
                    case_insensitive,
                }
            }
            Token::Colon => {
                let (value, case_insensitive) = match self.advance() {
                    Token::Word(s) | Token::Quoted(s) => (Pattern::Literal(s), false),
                    Token::Regex {
                        source,
                        case_insensitive,
                    } => (Pattern::Regex(source), case_insensitive),
                    other => {
                        return Err(CompileError::syntax(format!(
                            "expected a value after ':', got {other:?}"
                        )));
                    }
                };
                Condition {
                    key,
                    kind: ConditionKind::Substring,
                    value,
                    case_insensitive,
                }
            }
            other => {
                return Err(CompileError::syntax(format!(
                    "expected an operator after the tag key, got {other:?}"
                )));
            }
        };

        Ok(Expression::Condition(cond))
    }
}

/// Accept a full RFC 3339 timestamp as-is, or a bare `YYYY-MM-DD` date
/// normalized to midnight UTC.
fn normalize_timestamp(raw: &str) -> Result<String, CompileError> {
    if OffsetDateTime::parse(raw, &Rfc3339).is_ok() {
        return Ok(raw.to_string());
    }
    let midnight = format!("{raw}T00:00:00Z");
    if OffsetDateTime::parse(&midnight, &Rfc3339).is_ok() {
        return Ok(midnight);
    }
    Err(CompileError::syntax(format!(
        "'newer:' expects an RFC 3339 timestamp or a YYYY-MM-DD date, got '{raw}'"
    )))
}

fn parse_number(value: &str, kind: MetaKeyword) -> Result<u64, CompileError> {
    value.parse().map_err(|_| {
        CompileError::syntax(format!(
            "'{}:' expects a number, got '{value}'",
            kind.name()
        ))
    })
}

/// Strip the trailing region qualifier off the token list, if any.
///
/// A region keyword whose tail does not form a valid region name is left in
/// place so the expression parser reports it.
fn strip_region(tokens: &mut Vec<Token>, opts: &CompileOptions) -> RegionSpec {
    if matches!(tokens.last(), Some(Token::Global)) {
        tokens.pop();
        return RegionSpec::Global;
    }

    let Some(anchor) = tokens
        .iter()
        .rposition(|t| matches!(t, Token::In | Token::Around))
    else {
        return RegionSpec::Bbox;
    };

    let tail = &tokens[anchor + 1..];
    let Some(name) = region_name(tail) else {
        return RegionSpec::Bbox;
    };

    let region = if matches!(tokens[anchor], Token::In) {
        // `in bbox` only counts when bbox is a single bare word; quoting
        // makes it an area named "bbox".
        if matches!(tail, [Token::Word(w)] if w.as_str() == "bbox") {
            RegionSpec::Bbox
        } else {
            RegionSpec::Area(name)
        }
    } else {
        RegionSpec::Around {
            name,
            radius: opts.around_radius,
        }
    };
    tokens.truncate(anchor);
    region
}

/// The tail after a region keyword, joined into a name, or None when it
/// contains anything but words and quoted strings.
fn region_name(tail: &[Token]) -> Option<String> {
    if tail.is_empty() {
        return None;
    }
    let mut words = Vec::new();
    for tok in tail {
        match tok {
            Token::Word(s) | Token::Quoted(s) => words.push(s.as_str()),
            _ => return None,
        }
    }
    Some(words.join(" "))
}

/// The whole remaining input as a bare search term, if that is all it is.
fn freeform_term(tokens: &[Token]) -> Option<String> {
    let mut words = Vec::new();
    for tok in tokens {
        match tok {
            Token::Word(s) | Token::Quoted(s) => words.push(s.as_str()),
            _ => return None,
        }
    }
    (!words.is_empty()).then(|| words.join(" "))
}

/// Parse a search string into a query body plus region.
pub fn parse(input: &str, opts: &CompileOptions) -> Result<ParsedQuery, CompileError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CompileError::syntax("empty query"));
    }

    let mut tokens = tokenize(input)?;
    tokens.pop(); // Eof

    let region = strip_region(&mut tokens, opts);
    if tokens.is_empty() {
        return Err(CompileError::syntax(
            "missing filter before the region qualifier",
        ));
    }

    if let Some(term) = freeform_term(&tokens) {
        return Ok(ParsedQuery {
            body: QueryBody::Freeform(term),
            region,
        });
    }

    tokens.push(Token::Eof);
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_or_expr()?;

    // Ensure we consumed all tokens
    if !matches!(parser.peek(), Token::Eof) {
        return Err(CompileError::syntax(format!(
            "unexpected token after expression: {:?}",
            parser.peek()
        )));
    }

    Ok(ParsedQuery {
        body: QueryBody::Expression(expr),
        region,
    })
}
