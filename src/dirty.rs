//! Drift detection for late-bound filter values.
//!
//! When a row count is computed the resolved value of every placeholder in the
//! active filters is recorded. A later count request re-resolves them; any
//! difference means the cached count and page no longer describe the filters.

use crate::error::QueryError;
use crate::filter::FilterClause;
use crate::resolve::{is_blank, resolve_expression, ExpressionResolver, PlaceholderSyntax};
use sea_query::Value;

/// Placeholders and the values they resolved to at count time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirtySnapshot {
    placeholders: Vec<String>,
    values: Vec<Option<Value>>,
}

impl DirtySnapshot {
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }
}

/// Blank text and null variants compare equal to `None`.
fn normalize(value: Option<Value>) -> Option<Value> {
    value.filter(|v| !is_blank(v))
}

/// Tracks late-bound values between row count computations
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    snapshot: Option<DirtySnapshot>,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<&DirtySnapshot> {
        self.snapshot.as_ref()
    }

    /// Record the current resolution of every placeholder in `clauses`
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Resolution` if the resolver fails.
    pub fn capture(
        &mut self,
        clauses: &[FilterClause],
        resolver: &dyn ExpressionResolver,
        syntax: &PlaceholderSyntax,
    ) -> Result<(), QueryError> {
        let mut snapshot = DirtySnapshot::default();
        for placeholder in placeholders(clauses, syntax) {
            let value = normalize(resolve_expression(resolver, placeholder)?);
            snapshot.placeholders.push(placeholder.to_string());
            snapshot.values.push(value);
        }
        self.snapshot = Some(snapshot);
        Ok(())
    }

    /// Whether any placeholder now resolves differently from the snapshot
    ///
    /// A missing snapshot, or one taken over a different set of placeholders,
    /// is always dirty.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Resolution` if the resolver fails.
    pub fn is_dirty(
        &self,
        clauses: &[FilterClause],
        resolver: &dyn ExpressionResolver,
        syntax: &PlaceholderSyntax,
    ) -> Result<bool, QueryError> {
        let Some(snapshot) = &self.snapshot else {
            return Ok(true);
        };
        let current = placeholders(clauses, syntax);
        if current.len() != snapshot.placeholders.len()
            || current.iter().zip(&snapshot.placeholders).any(|(now, then)| now != then)
        {
            return Ok(true);
        }

        for (placeholder, previous) in current.iter().zip(&snapshot.values) {
            let value = normalize(resolve_expression(resolver, placeholder)?);
            if value != *previous {
                log::debug!("late-bound value `{placeholder}` changed since the last count");
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn clear(&mut self) {
        self.snapshot = None;
    }
}

fn placeholders<'c>(clauses: &'c [FilterClause], syntax: &PlaceholderSyntax) -> Vec<&'c str> {
    clauses
        .iter()
        .flat_map(|clause| clause.predicates())
        .flat_map(|predicate| syntax.placeholders(predicate))
        .collect()
}
