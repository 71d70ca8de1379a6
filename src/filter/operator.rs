//! Predicate operators and their rendering table.

use serde::{Deserialize, Serialize};

/// Comparison applied by a single column predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    Equal,
    NotEqual,
    Gt,
    Gte,
    Lt,
    Lte,
    /// `%value%`
    Like,
    /// `value%`
    BeginWith,
    /// `%value`
    EndWith,
    IsNull,
    NotNull,
    /// Literal list inlined into the query text
    In,
    /// Literal list inlined into the query text
    NotIn,
    /// Raw passthrough: the column expression is written verbatim and the
    /// resolved values are bound to whatever `?` it contains
    Query,
}

/// How an operator renders and binds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorSpec {
    /// Text written after the column expression, empty for [`Operator::Query`]
    pub token: &'static str,
    /// Whether the operator renders a `?` and binds the resolved value
    pub binds: bool,
    /// Null checks are rendered even when their value is absent
    pub null_check: bool,
    /// The value is rendered as an inline literal list
    pub inline_list: bool,
    /// Wildcards wrapped around the bound value: (leading `%`, trailing `%`)
    pub wildcard: (bool, bool),
}

impl OperatorSpec {
    const fn bind(token: &'static str) -> Self {
        Self { token, binds: true, null_check: false, inline_list: false, wildcard: (false, false) }
    }

    const fn like(leading: bool, trailing: bool) -> Self {
        Self { token: "LIKE ?", binds: true, null_check: false, inline_list: false, wildcard: (leading, trailing) }
    }

    const fn null_check(token: &'static str) -> Self {
        Self { token, binds: false, null_check: true, inline_list: false, wildcard: (false, false) }
    }

    const fn list(token: &'static str) -> Self {
        Self { token, binds: false, null_check: false, inline_list: true, wildcard: (false, false) }
    }
}

impl Operator {
    /// Rendering table entry for this operator.
    pub const fn spec(self) -> OperatorSpec {
        match self {
            Operator::Equal => OperatorSpec::bind("= ?"),
            Operator::NotEqual => OperatorSpec::bind("<> ?"),
            Operator::Gt => OperatorSpec::bind("> ?"),
            Operator::Gte => OperatorSpec::bind(">= ?"),
            Operator::Lt => OperatorSpec::bind("< ?"),
            Operator::Lte => OperatorSpec::bind("<= ?"),
            Operator::Like => OperatorSpec::like(true, true),
            Operator::BeginWith => OperatorSpec::like(false, true),
            Operator::EndWith => OperatorSpec::like(true, false),
            Operator::IsNull => OperatorSpec::null_check("is null"),
            Operator::NotNull => OperatorSpec::null_check("is not null"),
            Operator::In => OperatorSpec::list("IN"),
            Operator::NotIn => OperatorSpec::list("NOT IN"),
            Operator::Query => OperatorSpec {
                token: "",
                binds: true,
                null_check: false,
                inline_list: false,
                wildcard: (false, false),
            },
        }
    }

    /// Apply this operator's wildcards to a textual value
    pub fn wildcard(self, value: &str) -> String {
        match self.spec().wildcard {
            (true, true) => format!("%{value}%"),
            (false, true) => format!("{value}%"),
            (true, false) => format!("%{value}"),
            (false, false) => value.to_string(),
        }
    }
}
