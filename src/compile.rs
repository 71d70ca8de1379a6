//! Filter clause compilation.
//!
//! Turns an ordered list of [`FilterClause`]s into a parenthesized,
//! operator-joined WHERE fragment plus the positional values its `?` markers
//! bind. Every compile starts from an empty value list.

use crate::alias::RootAlias;
use crate::error::QueryError;
use crate::filter::{ColumnPredicate, FilterClause, GroupOperand, Operator};
use crate::resolve::{ExpressionResolver, PlaceholderSyntax, Resolution, ValueResolver};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_query::Value;

static WHERE_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bwhere\b").unwrap_or_else(|e| panic!("invalid where pattern: {e}")));

/// Whether `text` already carries a `WHERE` keyword (textual, case-insensitive).
pub(crate) fn has_where(text: &str) -> bool {
    WHERE_KEYWORD.is_match(text)
}

/// Compiled WHERE fragment and the values bound by its `?` markers
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledFilter {
    pub fragment: String,
    pub values: Vec<Value>,
}

impl CompiledFilter {
    pub fn is_empty(&self) -> bool {
        self.fragment.is_empty()
    }
}

/// Compiles filter clauses against a root alias
pub struct PredicateCompiler<'a> {
    alias: &'a RootAlias,
    values: ValueResolver<'a>,
}

impl<'a> PredicateCompiler<'a> {
    pub fn new(
        alias: &'a RootAlias,
        resolver: &'a dyn ExpressionResolver,
        syntax: &'a PlaceholderSyntax,
    ) -> Self {
        Self {
            alias,
            values: ValueResolver::new(resolver, syntax),
        }
    }

    /// Compile `clauses` into a fragment without a leading `WHERE`
    ///
    /// Clauses whose predicates are all dropped contribute nothing and do not
    /// consume a join operand.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::UnsupportedValue` for late-bound `IN` values and
    /// `QueryError::Resolution` when the resolver fails.
    pub fn compile(&self, clauses: &[FilterClause]) -> Result<CompiledFilter, QueryError> {
        let mut compiled = CompiledFilter::default();
        for clause in clauses {
            let Some(body) = self.compile_clause(clause, &mut compiled.values)? else {
                continue;
            };
            if !compiled.fragment.is_empty() {
                compiled.fragment.push(' ');
                compiled.fragment.push_str(clause.get_logical_operand_clause().as_str());
                compiled.fragment.push(' ');
            }
            match clause.get_group_operand() {
                GroupOperand::Group => {
                    compiled.fragment.push('(');
                    compiled.fragment.push_str(&body);
                    compiled.fragment.push(')');
                }
                GroupOperand::NoGroup => compiled.fragment.push_str(&body),
            }
        }
        Ok(compiled)
    }

    /// Compile `clauses` and append them to `text`
    ///
    /// When `text` already contains `WHERE` the fragment is joined with `AND`,
    /// otherwise a `WHERE` keyword is inserted. Nothing is appended when every
    /// predicate was dropped.
    pub fn apply(&self, clauses: &[FilterClause], text: &mut String) -> Result<Vec<Value>, QueryError> {
        let compiled = self.compile(clauses)?;
        if !compiled.is_empty() {
            text.push_str(if has_where(text) { " AND " } else { " WHERE " });
            text.push_str(&compiled.fragment);
        }
        Ok(compiled.values)
    }

    fn compile_clause(
        &self,
        clause: &FilterClause,
        values: &mut Vec<Value>,
    ) -> Result<Option<String>, QueryError> {
        let mut rendered = Vec::with_capacity(clause.len());
        for predicate in clause {
            let token = predicate.operator().spec().token;
            let column = self.render_column(predicate);
            let text = match self.values.resolve(predicate)? {
                Resolution::Dropped => continue,
                Resolution::NullCheck => format!("{column} {token}"),
                Resolution::Inline(list) => format!("{column} {token} ( {list} )"),
                Resolution::Bind(bound) => {
                    values.extend(bound);
                    if predicate.operator() == Operator::Query {
                        column
                    } else {
                        format!("{column} {token}")
                    }
                }
            };
            rendered.push(text);
        }

        if rendered.is_empty() {
            return Ok(None);
        }
        let separator = format!(" {} ", clause.get_logical_operand());
        Ok(Some(rendered.join(&separator)))
    }

    fn render_column(&self, predicate: &ColumnPredicate) -> String {
        let column = self.alias.qualify(predicate.column_expression());
        match predicate.function() {
            Some(function) => function.parse_column(&column),
            None => column,
        }
    }
}
