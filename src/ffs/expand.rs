//! Boolean expansion into disjunctive normal form.
//!
//! `and` distributes over `or` via `(A or B) and C = (A and C) or (B and
//! C)`, recursively, until the expression is a flat list of AND-only
//! clauses. Clause order is deterministic: `or` branches left to right,
//! `and` products with the left operand as the outer loop.

use super::ast::{Clause, Condition, Expression, MetaCondition, RegionSpec, TypeSet};
use super::normalize::normalize;

/// One AND-path through the expression tree, still without a region.
#[derive(Debug, Clone)]
struct Branch {
    conditions: Vec<Condition>,
    types: TypeSet,
    qualifiers: Vec<MetaCondition>,
}

impl Branch {
    fn neutral() -> Self {
        Branch {
            conditions: Vec::new(),
            types: TypeSet::ALL,
            qualifiers: Vec::new(),
        }
    }

    fn merge(&self, other: &Branch) -> Branch {
        let mut merged = self.clone();
        merged.conditions.extend(other.conditions.iter().cloned());
        merged.types = merged.types.intersect(other.types);
        merged.qualifiers.extend(other.qualifiers.iter().cloned());
        merged
    }
}

fn expand_expr(expr: &Expression) -> Vec<Branch> {
    match expr {
        Expression::Condition(cond) => {
            let mut branch = Branch::neutral();
            branch.conditions.push(normalize(cond.clone()));
            vec![branch]
        }
        Expression::Meta(MetaCondition::Type(t)) => {
            let mut branch = Branch::neutral();
            branch.types = TypeSet::only(*t);
            vec![branch]
        }
        Expression::Meta(meta) => {
            let mut branch = Branch::neutral();
            branch.qualifiers.push(meta.clone());
            vec![branch]
        }
        Expression::Or(left, right) => {
            let mut branches = expand_expr(left);
            branches.extend(expand_expr(right));
            branches
        }
        Expression::And(left, right) => {
            let left = expand_expr(left);
            let right = expand_expr(right);
            let mut branches = Vec::with_capacity(left.len() * right.len());
            for l in &left {
                for r in &right {
                    branches.push(l.merge(r));
                }
            }
            branches
        }
    }
}

/// Expand an expression into clauses, normalizing every condition on the
/// way. `initial_types` narrows all clauses up front (preset geometry);
/// expression queries pass [`TypeSet::ALL`]. Clauses whose type set
/// intersects to empty are dropped.
pub fn expand(expr: &Expression, region: &RegionSpec, initial_types: TypeSet) -> Vec<Clause> {
    let mut clauses = Vec::new();
    for branch in expand_expr(expr) {
        let types = branch.types.intersect(initial_types);
        if types.is_empty() {
            tracing::debug!("Dropping clause with an empty element-type set");
            continue;
        }
        clauses.push(Clause {
            conditions: branch.conditions,
            types,
            qualifiers: branch.qualifiers,
            region: region.clone(),
        });
    }
    clauses
}
