//! Lexer/tokenizer for the free-form search language.

use winnow::ascii::multispace0;
use winnow::combinator::alt;
use winnow::prelude::*;
use winnow::token::take_while;

use crate::error::CompileError;

/// Token types for the search language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    // Identifiers and values
    Word(String),   // bare tag key, value, or preset word
    Quoted(String), // 'single' or "double" quoted, escapes resolved
    Regex {
        source: String,
        case_insensitive: bool,
    },

    // Comparison operators
    Eq,       // =
    Neq,      // !=
    Tilde,    // ~
    NotTilde, // !~
    Colon,    // :

    // Boolean operators
    And, // and, &, &&
    Or,  // or, |, ||

    // Punctuation
    LParen, // (
    RParen, // )
    Star,   // *

    // Region keywords (bare words only)
    In,
    Around,
    Global,

    // End of input
    Eof,
}

// Manually define PResult for resilience against winnow version changes
type PResult<T> = Result<T, winnow::error::ErrMode<winnow::error::ContextError>>;

fn lex_fail<T>() -> PResult<T> {
    Err(winnow::error::ErrMode::Backtrack(
        winnow::error::ContextError::default(),
    ))
}

/// Lex a bare word. Allowed: alphanumeric, underscore, dash, dot.
/// The boolean and region keywords are only recognized here, so quoting
/// turns them back into plain values.
fn lex_word(input: &mut &str) -> PResult<Token> {
    let s = take_while(1.., |c: char| {
        c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
    })
    .parse_next(input)?;

    Ok(match s {
        "and" => Token::And,
        "or" => Token::Or,
        "in" => Token::In,
        "around" => Token::Around,
        "global" => Token::Global,
        _ => Token::Word(s.to_string()),
    })
}

/// Lex a quoted string with backslash escaping. `\n` and `\t` become the
/// control character; any other escaped character stands for itself.
fn lex_quoted(input: &mut &str) -> PResult<Token> {
    let mut chars = input.char_indices();
    let quote = match chars.next() {
        Some((_, c @ ('\'' | '"'))) => c,
        _ => return lex_fail(),
    };

    let mut text = String::new();
    while let Some((idx, c)) = chars.next() {
        if c == quote {
            *input = &input[idx + c.len_utf8()..];
            return Ok(Token::Quoted(text));
        }
        match c {
            '\\' => match chars.next() {
                Some((_, 'n')) => text.push('\n'),
                Some((_, 't')) => text.push('\t'),
                Some((_, esc)) => text.push(esc),
                None => return lex_fail(),
            },
            c => text.push(c),
        }
    }

    // No closing quote; tokenize() reports this as unterminated.
    lex_fail()
}

/// Lex a `/…/` regex literal with an optional trailing `i` modifier.
/// `\/` unescapes to `/`; every other backslash sequence is kept verbatim
/// for the query backend's regex engine.
fn lex_regex(input: &mut &str) -> PResult<Token> {
    let mut chars = input.char_indices();
    if !matches!(chars.next(), Some((_, '/'))) {
        return lex_fail();
    }

    let mut source = String::new();
    loop {
        match chars.next() {
            Some((idx, '/')) => {
                let tail = &input[idx + 1..];
                let modifiers: String = tail
                    .chars()
                    .take_while(|c| c.is_ascii_alphabetic())
                    .collect();
                let case_insensitive = match modifiers.as_str() {
                    "" => false,
                    "i" => true,
                    _ => return lex_fail(),
                };
                *input = &tail[modifiers.len()..];
                return Ok(Token::Regex {
                    source,
                    case_insensitive,
                });
            }
            Some((_, '\\')) => match chars.next() {
                Some((_, '/')) => source.push('/'),
                Some((_, c)) => {
                    source.push('\\');
                    source.push(c);
                }
                None => return lex_fail(),
            },
            Some((_, c)) => source.push(c),
            None => return lex_fail(),
        }
    }
}

/// Lex a single token.
fn lex_token(input: &mut &str) -> PResult<Token> {
    multispace0.parse_next(input)?;

    if input.is_empty() {
        return Ok(Token::Eof);
    }

    alt((
        // Multi-char operators first
        "!=".value(Token::Neq),
        "!~".value(Token::NotTilde),
        "&&".value(Token::And),
        "||".value(Token::Or),
        // Single-char operators
        "=".value(Token::Eq),
        "~".value(Token::Tilde),
        ":".value(Token::Colon),
        "&".value(Token::And),
        "|".value(Token::Or),
        "(".value(Token::LParen),
        ")".value(Token::RParen),
        "*".value(Token::Star),
        // Literals
        lex_regex,
        lex_quoted,
        lex_word,
    ))
    .parse_next(input)
}

/// Tokenize the entire input.
pub fn tokenize(input: &str) -> Result<Vec<Token>, CompileError> {
    let mut remaining = input;
    let mut tokens = Vec::new();

    loop {
        match lex_token(&mut remaining) {
            Ok(Token::Eof) => break,
            Ok(tok) => tokens.push(tok),
            Err(_) => return Err(diagnose(remaining)),
        }
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

/// Turn the unconsumed tail of a failed lex into a syntax error.
fn diagnose(remaining: &str) -> CompileError {
    match remaining.chars().next() {
        Some('\'' | '"') => CompileError::syntax("unterminated quoted string"),
        Some('/') => {
            if regex_has_close(remaining) {
                CompileError::syntax("invalid regex modifier, only 'i' is supported")
            } else {
                CompileError::syntax("unterminated regex literal")
            }
        }
        _ => CompileError::syntax(format!("unrecognized input at '{remaining}'")),
    }
}

/// Whether a `/…` tail contains an unescaped closing slash.
fn regex_has_close(s: &str) -> bool {
    let mut chars = s.chars().skip(1);
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '/' => return true,
            _ => {}
        }
    }
    false
}
