//! Late-bound value resolution and per-operator value transforms.
//!
//! A predicate value either binds (one or more `?` values), renders inline
//! (`IN` lists), renders nothing (null checks), or is dropped from the query
//! entirely because it resolved to null or blank text.

use crate::error::QueryError;
use crate::filter::{ColumnPredicate, FilterValue, Operator};
use sea_query::Value;
use std::cell::RefCell;
use std::collections::HashMap;

/// Result of resolving one late-bound expression
pub type ResolveResult = Result<Option<Value>, Box<dyn std::error::Error + Send + Sync>>;

/// Resolves late-bound placeholders (`#{...}`) against external context
///
/// Returning `Ok(None)` means "no value": the predicate carrying the placeholder
/// is left out of the query. Implementations must be idempotent within one build.
pub trait ExpressionResolver {
    fn resolve(&self, placeholder: &str) -> ResolveResult;
}

impl<F> ExpressionResolver for F
where
    F: Fn(&str) -> ResolveResult,
{
    fn resolve(&self, placeholder: &str) -> ResolveResult {
        self(placeholder)
    }
}

/// Resolver for controllers without late-bound values: every placeholder is null.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

impl ExpressionResolver for NoopResolver {
    fn resolve(&self, _placeholder: &str) -> ResolveResult {
        Ok(None)
    }
}

/// In-memory resolver keyed by the full placeholder text
///
/// Values can be replaced between builds through a shared reference, which is
/// how request-scoped context changes under a live controller.
#[derive(Debug, Default)]
pub struct MapResolver {
    values: RefCell<HashMap<String, Value>>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, placeholder: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(placeholder, value);
        self
    }

    pub fn insert(&self, placeholder: impl Into<String>, value: impl Into<Value>) {
        self.values.borrow_mut().insert(placeholder.into(), value.into());
    }

    pub fn remove(&self, placeholder: &str) {
        self.values.borrow_mut().remove(placeholder);
    }
}

impl ExpressionResolver for MapResolver {
    fn resolve(&self, placeholder: &str) -> ResolveResult {
        Ok(self.values.borrow().get(placeholder).cloned())
    }
}

pub(crate) fn resolve_expression(
    resolver: &dyn ExpressionResolver,
    placeholder: &str,
) -> Result<Option<Value>, QueryError> {
    resolver
        .resolve(placeholder)
        .map_err(|e| QueryError::Resolution(format!("failed to resolve `{placeholder}`: {e}")))
}

/// Delimiters marking a late-bound value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderSyntax {
    pub prefix: String,
    pub suffix: String,
}

impl Default for PlaceholderSyntax {
    fn default() -> Self {
        Self {
            prefix: "#{".to_string(),
            suffix: "}".to_string(),
        }
    }
}

impl PlaceholderSyntax {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn is_placeholder(&self, text: &str) -> bool {
        let text = text.trim();
        text.len() >= self.prefix.len() + self.suffix.len()
            && text.starts_with(&self.prefix)
            && text.ends_with(&self.suffix)
    }

    /// Whether any comma separated item of `text` is a placeholder
    pub fn contains_placeholder(&self, text: &str) -> bool {
        self.is_placeholder(text) || text.split(',').any(|item| self.is_placeholder(item))
    }

    /// Every placeholder a predicate resolves at build time, in order
    ///
    /// Only `QUERY` predicates split their value on commas; other operators
    /// resolve the whole value as a single placeholder.
    pub fn placeholders<'p>(&self, predicate: &'p ColumnPredicate) -> Vec<&'p str> {
        let spec = predicate.operator().spec();
        let FilterValue::Text(text) = predicate.value() else {
            return Vec::new();
        };
        if spec.null_check || spec.inline_list {
            Vec::new()
        } else if predicate.operator() == Operator::Query {
            text.split(',')
                .map(str::trim)
                .filter(|item| self.is_placeholder(item))
                .collect()
        } else if self.is_placeholder(text) {
            vec![text.trim()]
        } else {
            Vec::new()
        }
    }
}

/// True for null variants and for text that is empty after trimming.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::String(Some(s)) => s.trim().is_empty(),
        Value::Bool(None)
        | Value::TinyInt(None)
        | Value::SmallInt(None)
        | Value::Int(None)
        | Value::BigInt(None)
        | Value::TinyUnsigned(None)
        | Value::SmallUnsigned(None)
        | Value::Unsigned(None)
        | Value::BigUnsigned(None)
        | Value::Float(None)
        | Value::Double(None)
        | Value::String(None)
        | Value::Char(None)
        | Value::Bytes(None)
        | Value::Json(None)
        | Value::ChronoDate(None)
        | Value::ChronoTime(None)
        | Value::ChronoDateTime(None)
        | Value::ChronoDateTimeUtc(None)
        | Value::ChronoDateTimeLocal(None)
        | Value::ChronoDateTimeWithTimeZone(None)
        | Value::Uuid(None)
        | Value::Decimal(None) => true,
        _ => false,
    }
}

/// Rebind timestamps as plain dates for driver compatibility.
pub(crate) fn coerce_date(value: Value) -> Value {
    let date = match &value {
        Value::ChronoDateTime(Some(dt)) => Some(dt.date()),
        Value::ChronoDateTimeUtc(Some(dt)) => Some(dt.date_naive()),
        Value::ChronoDateTimeLocal(Some(dt)) => Some(dt.date_naive()),
        Value::ChronoDateTimeWithTimeZone(Some(dt)) => Some(dt.date_naive()),
        _ => None,
    };
    date.map(Value::from).unwrap_or(value)
}

/// Unquoted textual form of a value, `None` for nulls and unsupported types.
pub(crate) fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Bool(Some(b)) => b.to_string(),
        Value::TinyInt(Some(i)) => i.to_string(),
        Value::SmallInt(Some(i)) => i.to_string(),
        Value::Int(Some(i)) => i.to_string(),
        Value::BigInt(Some(i)) => i.to_string(),
        Value::TinyUnsigned(Some(u)) => u.to_string(),
        Value::SmallUnsigned(Some(u)) => u.to_string(),
        Value::Unsigned(Some(u)) => u.to_string(),
        Value::BigUnsigned(Some(u)) => u.to_string(),
        Value::Float(Some(f)) => f.to_string(),
        Value::Double(Some(d)) => d.to_string(),
        Value::String(Some(s)) => s.to_string(),
        Value::Char(Some(c)) => c.to_string(),
        Value::ChronoDate(Some(d)) => d.to_string(),
        Value::ChronoTime(Some(t)) => t.to_string(),
        Value::ChronoDateTime(Some(dt)) => dt.to_string(),
        Value::ChronoDateTimeUtc(Some(dt)) => dt.to_string(),
        Value::ChronoDateTimeLocal(Some(dt)) => dt.to_string(),
        Value::ChronoDateTimeWithTimeZone(Some(dt)) => dt.to_string(),
        Value::Uuid(Some(u)) => u.to_string(),
        Value::Decimal(Some(d)) => d.to_string(),
        _ => return None,
    };
    Some(text)
}

/// Render a value as an inline SQL literal: numbers and booleans bare,
/// everything else single-quoted.
pub(crate) fn render_literal(value: &Value) -> Result<String, QueryError> {
    let text = value_text(value).ok_or_else(|| {
        QueryError::unsupported_value(format!("{value:?} can not be rendered as an inline literal"))
    })?;
    let bare = matches!(
        value,
        Value::Bool(_)
            | Value::TinyInt(_)
            | Value::SmallInt(_)
            | Value::Int(_)
            | Value::BigInt(_)
            | Value::TinyUnsigned(_)
            | Value::SmallUnsigned(_)
            | Value::Unsigned(_)
            | Value::BigUnsigned(_)
            | Value::Float(_)
            | Value::Double(_)
            | Value::Decimal(_)
    );
    if bare {
        Ok(text)
    } else {
        Ok(format!("'{}'", text.replace('\'', "''")))
    }
}

/// What a predicate contributes once its value is resolved
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Resolution {
    /// Left out of the query
    Dropped,
    /// `is null` / `is not null`, nothing bound
    NullCheck,
    /// Comma joined literal list inlined into the text
    Inline(String),
    /// Values bound, in order, to the predicate's `?` markers
    Bind(Vec<Value>),
}

/// Resolves predicate values for one build pass
pub(crate) struct ValueResolver<'a> {
    resolver: &'a dyn ExpressionResolver,
    syntax: &'a PlaceholderSyntax,
}

impl<'a> ValueResolver<'a> {
    pub(crate) fn new(resolver: &'a dyn ExpressionResolver, syntax: &'a PlaceholderSyntax) -> Self {
        Self { resolver, syntax }
    }

    pub(crate) fn resolve(&self, predicate: &ColumnPredicate) -> Result<Resolution, QueryError> {
        let operator = predicate.operator();
        let spec = operator.spec();
        if spec.null_check {
            return Ok(Resolution::NullCheck);
        }
        if spec.inline_list {
            return self.resolve_list(predicate.value());
        }

        let raw = match predicate.value() {
            FilterValue::Null => return Ok(Resolution::Dropped),
            FilterValue::Text(text) if text.trim().is_empty() => return Ok(Resolution::Dropped),
            FilterValue::Text(text) => {
                match self.resolve_text(text, operator == Operator::Query)? {
                    Some(values) => values,
                    None => return Ok(Resolution::Dropped),
                }
            }
            FilterValue::Scalar(value) if is_blank(value) => return Ok(Resolution::Dropped),
            FilterValue::Scalar(value) => vec![value.clone()],
            FilterValue::List(values) if operator == Operator::Query => {
                if values.is_empty() || values.iter().any(is_blank) {
                    return Ok(Resolution::Dropped);
                }
                values.clone()
            }
            FilterValue::List(_) => {
                return Err(QueryError::unsupported_value(format!(
                    "list values are only supported by IN, NOT IN and QUERY, not {operator:?} on `{}`",
                    predicate.column_expression()
                )));
            }
        };

        let values = raw
            .into_iter()
            .map(|value| {
                let mut value = coerce_date(value);
                if spec.wildcard != (false, false) {
                    if let Some(text) = value_text(&value) {
                        value = Value::from(operator.wildcard(&text));
                    }
                }
                match predicate.function() {
                    Some(function) => function.parse_column_value(value),
                    None => value,
                }
            })
            .collect();
        Ok(Resolution::Bind(values))
    }

    /// Literal text or placeholders; `None` when any placeholder resolves blank.
    fn resolve_text(&self, text: &str, fan_out: bool) -> Result<Option<Vec<Value>>, QueryError> {
        if !fan_out && text.contains(',') && text.split(',').any(|item| self.syntax.is_placeholder(item)) {
            return Err(QueryError::unsupported_value(format!(
                "comma separated placeholders are only supported by QUERY: `{text}`"
            )));
        }
        let items: Vec<&str> = if fan_out && text.contains(',') {
            text.split(',').map(str::trim).collect()
        } else {
            vec![text]
        };

        let mut values = Vec::with_capacity(items.len());
        for item in items {
            if self.syntax.is_placeholder(item) {
                match resolve_expression(self.resolver, item.trim())? {
                    Some(value) if !is_blank(&value) => values.push(value),
                    _ => return Ok(None),
                }
            } else if item.trim().is_empty() {
                return Ok(None);
            } else {
                values.push(Value::from(item));
            }
        }
        Ok(Some(values))
    }

    fn resolve_list(&self, value: &FilterValue) -> Result<Resolution, QueryError> {
        match value {
            FilterValue::Null => Ok(Resolution::Dropped),
            FilterValue::Text(text) if text.trim().is_empty() => Ok(Resolution::Dropped),
            FilterValue::Text(text) if self.syntax.contains_placeholder(text) => Err(
                QueryError::unsupported_value(format!("in values can not be late-bound: `{text}`")),
            ),
            FilterValue::Text(text) => Ok(Resolution::Inline(text.trim().to_string())),
            FilterValue::Scalar(value) if is_blank(value) => Ok(Resolution::Dropped),
            FilterValue::Scalar(value) => Ok(Resolution::Inline(render_literal(value)?)),
            FilterValue::List(values) if values.is_empty() => Ok(Resolution::Dropped),
            FilterValue::List(values) => {
                let literals = values
                    .iter()
                    .map(render_literal)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Resolution::Inline(literals.join(", ")))
            }
        }
    }
}
