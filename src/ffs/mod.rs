//! Free-form search: compact filter expressions compiled to Overpass QL.
//!
//! Syntax:
//!   key=value               - exact match
//!   key!=value              - negated match
//!   key=*                   - tag exists
//!   key!=*                  - tag doesn't exist
//!   key~/regex/             - regex match (optional trailing i modifier)
//!   key!~/regex/            - negated regex match
//!   key:value               - substring match (value is regex-escaped)
//!   type:node               - element type filter (node/way/relation)
//!   newer:2024-05-01        - edited since a date or RFC 3339 timestamp
//!   user:name, uid:n, id:n  - edit metadata filters
//!   expr and expr           - AND (also & / &&), binds tighter than OR
//!   expr or expr            - OR (also | / ||)
//!   (expr)                  - grouping
//!   ... in <name>           - restrict to a named area
//!   ... in bbox             - restrict to the current bounding box (default)
//!   ... around <name>       - restrict to a radius around a named place
//!   ... global              - no spatial restriction
//!
//! A plain term with no operators ("Drinking Water") is looked up in the
//! preset catalog instead and compiles to that preset's tag filters.

mod ast;
mod emit;
mod expand;
mod lexer;
mod normalize;
mod parser;

pub use ast::*;
pub use parser::{ParsedQuery, QueryBody, parse};

use crate::error::CompileError;
use crate::presets::PresetCatalog;

/// Knobs for a compile call.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Radius in meters applied to `around` regions.
    pub around_radius: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions { around_radius: 1000 }
    }
}

/// A compiled query plus its shape, for logging and tests.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub query: String,
    pub clauses: usize,
    pub statements: usize,
}

/// Compile a search string into an Overpass QL query.
///
/// The catalog is only consulted when the input is a bare preset name.
/// `None` means no catalog has been loaded yet, which fails such inputs
/// with [`CompileError::CatalogNotReady`] instead of guessing.
pub fn compile(
    input: &str,
    catalog: Option<&PresetCatalog>,
    opts: &CompileOptions,
) -> Result<Compilation, CompileError> {
    let parsed = parse(input, opts)?;

    let clauses = match &parsed.body {
        QueryBody::Expression(expr) => expand::expand(expr, &parsed.region, TypeSet::ALL),
        QueryBody::Freeform(term) => {
            let catalog = catalog.ok_or(CompileError::CatalogNotReady)?;
            let resolved = catalog
                .resolve(term)
                .ok_or_else(|| CompileError::PresetNotFound(term.clone()))?;
            match &resolved.expr {
                Some(expr) => expand::expand(expr, &parsed.region, resolved.types),
                // A preset with no tags matches everything of its types.
                None => vec![Clause {
                    conditions: Vec::new(),
                    types: resolved.types,
                    qualifiers: Vec::new(),
                    region: parsed.region.clone(),
                }],
            }
        }
    };

    let statements: usize = clauses.iter().map(|c| c.types.count()).sum();
    tracing::debug!(
        "Expanded into {} clauses ({} statements)",
        clauses.len(),
        statements
    );

    let query = emit::emit(&clauses, &parsed.region);
    Ok(Compilation {
        query,
        clauses: clauses.len(),
        statements,
    })
}
