//! Condition canonicalization.
//!
//! Every condition the parser or the preset resolver produces passes
//! through [`normalize`] before expansion. The function is total: it never
//! fails, it only rewrites conditions into forms the emitter can render.

use super::ast::{Condition, ConditionKind, Pattern};

/// Regex matching exactly the empty string. Empty keys and values are
/// carried this way because the emitted query language cannot express
/// anchors in plain-equality syntax.
const ANCHORED_EMPTY: &str = "^$";

/// Backslash-escape the regex metacharacters in a literal string.
pub fn regex_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(
            c,
            '.' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '^' | '$' | '\\'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn upgrade_to_regex(kind: ConditionKind) -> ConditionKind {
    match kind {
        ConditionKind::Equals => ConditionKind::RegexMatch,
        ConditionKind::NotEquals => ConditionKind::NotRegexMatch,
        other => other,
    }
}

/// Canonicalize one condition.
///
/// Rewrites applied, in order:
/// - substring matches become regex matches with the literal value escaped
/// - an empty value becomes the anchored-empty regex, upgrading equality
///   kinds to their regex counterparts so the anchors survive
/// - an empty key moves the whole condition into the key-regex form, which
///   only supports regex values; a literal value is anchored as `^…$`, and
///   existence checks turn into matches against `.*`
pub fn normalize(cond: Condition) -> Condition {
    let Condition {
        mut key,
        mut kind,
        mut value,
        case_insensitive,
    } = cond;

    if kind == ConditionKind::Substring {
        value = match value {
            Pattern::Literal(s) => Pattern::Regex(regex_escape(&s)),
            regex => regex,
        };
        kind = ConditionKind::RegexMatch;
    }

    let has_value = !matches!(kind, ConditionKind::HasKey | ConditionKind::LacksKey);
    if has_value && value.is_empty() {
        value = Pattern::Regex(ANCHORED_EMPTY.to_string());
        kind = upgrade_to_regex(kind);
    }

    if key.is_empty() {
        key = Pattern::Regex(ANCHORED_EMPTY.to_string());
        match kind {
            ConditionKind::Equals | ConditionKind::NotEquals => {
                if let Pattern::Literal(s) = &value {
                    value = Pattern::Regex(format!("^{}$", regex_escape(s)));
                }
                kind = upgrade_to_regex(kind);
            }
            ConditionKind::HasKey => {
                value = Pattern::Regex(".*".to_string());
                kind = ConditionKind::RegexMatch;
            }
            ConditionKind::LacksKey => {
                value = Pattern::Regex(".*".to_string());
                kind = ConditionKind::NotRegexMatch;
            }
            _ => {}
        }
    }

    Condition {
        key,
        kind,
        value,
        case_insensitive,
    }
}
