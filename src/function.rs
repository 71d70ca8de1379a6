//! Column function plugins.
//!
//! A [`ColumnFunction`] rewrites both sides of a predicate: the rendered column
//! expression (`UPPER(e.name)`) and the value bound against it.

use sea_query::Value;

/// Column and value rewrite hook applied to a predicate
pub trait ColumnFunction {
    /// Short name used in debug output
    fn name(&self) -> &str;

    /// Rewrite the (already alias-qualified) column expression
    fn parse_column(&self, column: &str) -> String;

    /// Rewrite a resolved value before it is bound
    fn parse_column_value(&self, value: Value) -> Value;
}

fn map_text(value: Value, f: impl FnOnce(&str) -> String) -> Value {
    match value {
        Value::String(Some(s)) => Value::from(f(&s)),
        other => other,
    }
}

/// `UPPER(column)` compared against an upper-cased value
#[derive(Debug, Clone, Copy, Default)]
pub struct Upper;

impl ColumnFunction for Upper {
    fn name(&self) -> &str {
        "UPPER"
    }

    fn parse_column(&self, column: &str) -> String {
        format!("UPPER({column})")
    }

    fn parse_column_value(&self, value: Value) -> Value {
        map_text(value, str::to_uppercase)
    }
}

/// `LOWER(column)` compared against a lower-cased value
#[derive(Debug, Clone, Copy, Default)]
pub struct Lower;

impl ColumnFunction for Lower {
    fn name(&self) -> &str {
        "LOWER"
    }

    fn parse_column(&self, column: &str) -> String {
        format!("LOWER({column})")
    }

    fn parse_column_value(&self, value: Value) -> Value {
        map_text(value, str::to_lowercase)
    }
}

/// `TRIM(column)` compared against a trimmed value
#[derive(Debug, Clone, Copy, Default)]
pub struct Trim;

impl ColumnFunction for Trim {
    fn name(&self) -> &str {
        "TRIM"
    }

    fn parse_column(&self, column: &str) -> String {
        format!("TRIM({column})")
    }

    fn parse_column_value(&self, value: Value) -> Value {
        map_text(value, |s| s.trim().to_string())
    }
}
