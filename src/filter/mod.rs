//! Filter clauses and column predicates.
//!
//! A [`FilterClause`] is an ordered list of [`ColumnPredicate`]s joined by one
//! [`LogicalOperand`]. Clauses are joined to the clause before them by their own
//! clause operand and optionally wrapped in parentheses.
//!
//! # Examples
//!
//! ```
//! use sluice::{FilterClause, LogicalOperand, GroupOperand};
//!
//! let clause = FilterClause::new()
//!     .or()
//!     .group(GroupOperand::Group)
//!     .join_with(LogicalOperand::And)
//!     .eq("status", "ACTIVE")
//!     .begin_with("name", "#{search.name}")
//!     .is_null("deleted_at");
//! assert_eq!(clause.len(), 3);
//! ```

pub mod operator;

pub use operator::{Operator, OperatorSpec};

use crate::function::ColumnFunction;
use crate::resolve::{resolve_expression, ExpressionResolver};
use crate::error::QueryError;
use sea_query::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Operator joining predicates inside a clause, or a clause to the previous one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperand {
    #[default]
    And,
    Or,
}

impl LogicalOperand {
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOperand::And => "AND",
            LogicalOperand::Or => "OR",
        }
    }

    /// Parse an operand name, case-insensitively
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "AND" => Some(LogicalOperand::And),
            "OR" => Some(LogicalOperand::Or),
            _ => None,
        }
    }

    /// Resolve an operand from an expression, defaulting to `AND`
    ///
    /// The expression is resolved through `resolver`; a null or empty result
    /// yields `AND`.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Resolution` if the resolver fails and
    /// `QueryError::UnsupportedValue` if the resolved text is neither `AND` nor `OR`.
    pub fn from_expression(
        resolver: &dyn ExpressionResolver,
        expression: &str,
    ) -> Result<Self, QueryError> {
        match resolve_expression(resolver, expression)? {
            Some(Value::String(Some(s))) if !s.trim().is_empty() => Self::parse(&s)
                .ok_or_else(|| QueryError::unsupported_value(format!("`{s}` is not a logical operand"))),
            _ => Ok(LogicalOperand::And),
        }
    }
}

impl fmt::Display for LogicalOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a clause's fragment is wrapped in parentheses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupOperand {
    Group,
    #[default]
    NoGroup,
}

/// Raw value attached to a predicate before resolution
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FilterValue {
    #[default]
    Null,
    /// Literal text, a late-bound placeholder (`#{...}`), or a comma separated
    /// list of either
    Text(String),
    /// Typed literal (number, boolean, date, ...)
    Scalar(Value),
    /// Collection literal, used by `IN` / `NOT IN`
    List(Vec<Value>),
}

impl FilterValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FilterValue::Null)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<Value> for FilterValue {
    fn from(value: Value) -> Self {
        FilterValue::Scalar(value)
    }
}

macro_rules! scalar_filter_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for FilterValue {
                fn from(value: $ty) -> Self {
                    FilterValue::Scalar(Value::from(value))
                }
            }
        )*
    };
}

scalar_filter_value!(
    bool,
    i16,
    i32,
    i64,
    u32,
    f32,
    f64,
    chrono::NaiveDate,
    chrono::NaiveDateTime,
    chrono::DateTime<chrono::Utc>,
    uuid::Uuid,
    rust_decimal::Decimal,
);

impl<T: Into<Value>> From<Vec<T>> for FilterValue {
    fn from(values: Vec<T>) -> Self {
        FilterValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for FilterValue {
    fn from(values: [T; N]) -> Self {
        FilterValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FilterValue::Null, Into::into)
    }
}

/// A single `column operator value` comparison
#[derive(Clone)]
pub struct ColumnPredicate {
    column_expression: String,
    operator: Operator,
    value: FilterValue,
    function: Option<Arc<dyn ColumnFunction>>,
}

impl ColumnPredicate {
    pub fn new(column_expression: impl Into<String>, operator: Operator, value: impl Into<FilterValue>) -> Self {
        Self {
            column_expression: column_expression.into(),
            operator,
            value: value.into(),
            function: None,
        }
    }

    /// Wrap the column and the bound value with a column function
    pub fn with_function(mut self, function: impl ColumnFunction + 'static) -> Self {
        self.function = Some(Arc::new(function));
        self
    }

    pub fn column_expression(&self) -> &str {
        &self.column_expression
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &FilterValue {
        &self.value
    }

    pub fn function(&self) -> Option<&dyn ColumnFunction> {
        self.function.as_deref()
    }
}

impl fmt::Debug for ColumnPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnPredicate")
            .field("column_expression", &self.column_expression)
            .field("operator", &self.operator)
            .field("value", &self.value)
            .field("function", &self.function.as_ref().map(|func| func.name()))
            .finish()
    }
}

/// Ordered predicates combined by one logical operand
#[derive(Debug, Clone, Default)]
pub struct FilterClause {
    predicates: Vec<ColumnPredicate>,
    logical_operand: LogicalOperand,
    logical_operand_clause: LogicalOperand,
    group_operand: GroupOperand,
}

impl FilterClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join predicates inside this clause with `AND`
    pub fn and(mut self) -> Self {
        self.logical_operand = LogicalOperand::And;
        self
    }

    /// Join predicates inside this clause with `OR`
    pub fn or(mut self) -> Self {
        self.logical_operand = LogicalOperand::Or;
        self
    }

    pub fn logical_operand(mut self, operand: LogicalOperand) -> Self {
        self.logical_operand = operand;
        self
    }

    /// Operator joining this clause to the previous one
    pub fn join_with(mut self, operand: LogicalOperand) -> Self {
        self.logical_operand_clause = operand;
        self
    }

    pub fn group(mut self, group: GroupOperand) -> Self {
        self.group_operand = group;
        self
    }

    pub fn predicate(mut self, predicate: ColumnPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn push(&mut self, predicate: ColumnPredicate) {
        self.predicates.push(predicate);
    }

    pub fn add(self, column: impl Into<String>, operator: Operator, value: impl Into<FilterValue>) -> Self {
        self.predicate(ColumnPredicate::new(column, operator, value))
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.add(column, Operator::Equal, value)
    }

    pub fn not_eq(self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.add(column, Operator::NotEqual, value)
    }

    pub fn gt(self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.add(column, Operator::Gt, value)
    }

    pub fn gte(self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.add(column, Operator::Gte, value)
    }

    pub fn lt(self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.add(column, Operator::Lt, value)
    }

    pub fn lte(self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.add(column, Operator::Lte, value)
    }

    pub fn like(self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.add(column, Operator::Like, value)
    }

    pub fn begin_with(self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.add(column, Operator::BeginWith, value)
    }

    pub fn end_with(self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.add(column, Operator::EndWith, value)
    }

    pub fn is_null(self, column: impl Into<String>) -> Self {
        self.add(column, Operator::IsNull, FilterValue::Null)
    }

    pub fn not_null(self, column: impl Into<String>) -> Self {
        self.add(column, Operator::NotNull, FilterValue::Null)
    }

    /// `column IN ( ... )` with the values inlined as literals
    ///
    /// List and scalar values are rendered as escaped literals. A text value is
    /// inlined verbatim as raw SQL, so pass a list for untrusted input.
    pub fn is_in(self, column: impl Into<String>, values: impl Into<FilterValue>) -> Self {
        self.add(column, Operator::In, values)
    }

    /// `column NOT IN ( ... )`; a text value is inlined verbatim as raw SQL,
    /// see [`is_in`](Self::is_in)
    pub fn not_in(self, column: impl Into<String>, values: impl Into<FilterValue>) -> Self {
        self.add(column, Operator::NotIn, values)
    }

    /// Raw expression whose `?` markers bind the (possibly comma separated) value
    pub fn raw(self, expression: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.add(expression, Operator::Query, value)
    }

    pub fn predicates(&self) -> &[ColumnPredicate] {
        &self.predicates
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn get_logical_operand(&self) -> LogicalOperand {
        self.logical_operand
    }

    pub fn get_logical_operand_clause(&self) -> LogicalOperand {
        self.logical_operand_clause
    }

    pub fn get_group_operand(&self) -> GroupOperand {
        self.group_operand
    }
}

impl<'a> IntoIterator for &'a FilterClause {
    type Item = &'a ColumnPredicate;
    type IntoIter = std::slice::Iter<'a, ColumnPredicate>;

    fn into_iter(self) -> Self::IntoIter {
        self.predicates.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::MapResolver;

    #[test]
    fn test_filter_value_conversions() {
        assert_eq!(FilterValue::from("x"), FilterValue::Text("x".to_string()));
        assert_eq!(FilterValue::from(5i32), FilterValue::Scalar(Value::from(5i32)));
        assert_eq!(FilterValue::from(None::<i32>), FilterValue::Null);
        assert_eq!(
            FilterValue::from(vec!["A", "B"]),
            FilterValue::List(vec![Value::from("A"), Value::from("B")])
        );
        assert_eq!(FilterValue::from([1i32, 2]), FilterValue::List(vec![Value::from(1i32), Value::from(2i32)]));
    }

    #[test]
    fn test_clause_defaults() {
        let clause = FilterClause::new();
        assert!(clause.is_empty());
        assert_eq!(clause.get_logical_operand(), LogicalOperand::And);
        assert_eq!(clause.get_logical_operand_clause(), LogicalOperand::And);
        assert_eq!(clause.get_group_operand(), GroupOperand::NoGroup);
    }

    #[test]
    fn test_clause_builder_keeps_order() {
        let clause = FilterClause::new()
            .or()
            .join_with(LogicalOperand::Or)
            .group(GroupOperand::Group)
            .eq("a", 1i32)
            .like("b", "x")
            .not_null("c");
        let columns: Vec<&str> = clause.into_iter().map(|p| p.column_expression()).collect();
        assert_eq!(columns, vec!["a", "b", "c"]);
        assert_eq!(clause.predicates()[1].operator(), Operator::Like);
        assert_eq!(clause.get_logical_operand(), LogicalOperand::Or);
        assert_eq!(clause.get_logical_operand_clause(), LogicalOperand::Or);
        assert_eq!(clause.get_group_operand(), GroupOperand::Group);
    }

    #[test]
    fn test_logical_operand_parse() {
        assert_eq!(LogicalOperand::parse("or"), Some(LogicalOperand::Or));
        assert_eq!(LogicalOperand::parse(" AND "), Some(LogicalOperand::And));
        assert_eq!(LogicalOperand::parse("xor"), None);
        assert_eq!(LogicalOperand::Or.to_string(), "OR");
    }

    #[test]
    fn test_logical_operand_from_expression() {
        let resolver = MapResolver::new().with("#{search.op}", "OR");
        let op = LogicalOperand::from_expression(&resolver, "#{search.op}").unwrap();
        assert_eq!(op, LogicalOperand::Or);

        let op = LogicalOperand::from_expression(&resolver, "#{missing}").unwrap();
        assert_eq!(op, LogicalOperand::And);

        let resolver = MapResolver::new().with("#{bad}", "NAND");
        assert!(LogicalOperand::from_expression(&resolver, "#{bad}").is_err());
    }
}
