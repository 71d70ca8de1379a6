//! Query assembly: template, joins, filters, grouping, ordering and paging.
//!
//! [`QueryAssembler::build`] produces the data query and
//! [`QueryAssembler::build_count`] its COUNT variant. Both run the same filter
//! compilation, so their WHERE fragments and bound values always agree.
//!
//! # Examples
//!
//! ```
//! use sluice::{FilterClause, NoopResolver, PaginationState, QueryAssembler};
//!
//! let mut assembler = QueryAssembler::with_template("from Employee e")?;
//! assembler.add_clause(FilterClause::new().eq("status", "ACTIVE"));
//!
//! let query = assembler.build(&NoopResolver, &PaginationState::with_max_results(20))?;
//! assert_eq!(query.text(), "from Employee e WHERE e.status = ? limit 20");
//!
//! let count = assembler.build_count(&NoopResolver)?;
//! assert_eq!(count.text(), "select count(*) from Employee e WHERE e.status = ?");
//! # Ok::<(), sluice::QueryError>(())
//! ```

use crate::alias::{normalize_whitespace, RootAlias};
use crate::compile::PredicateCompiler;
use crate::error::QueryError;
use crate::filter::FilterClause;
use crate::pagination::PaginationState;
use crate::query::Query;
use crate::resolve::{ExpressionResolver, PlaceholderSyntax};
use crate::sort::{GroupBy, Sort};
use once_cell::sync::Lazy;
use regex::Regex;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

static COUNT_FROM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bfrom\s(.*)").unwrap_or_else(|e| panic!("invalid from pattern: {e}")));

static GROUP_BY_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bgroup\s+by\b").unwrap_or_else(|e| panic!("invalid group by pattern: {e}")));

static ORDER_BY_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\border\s+by\b").unwrap_or_else(|e| panic!("invalid order by pattern: {e}")));

const DEFAULT_COUNT_PROJECTION: &str = "count(*)";

/// Append `list` under `keyword`, continuing an existing clause of the same kind.
fn append_listed(text: &mut String, pattern: &Regex, keyword: &str, list: &str) {
    if list.is_empty() {
        return;
    }
    if pattern.is_match(text) {
        text.push_str(", ");
    } else {
        text.push(' ');
        text.push_str(keyword);
        text.push(' ');
    }
    text.push_str(list);
}

/// Configured template plus the filters, joins, grouping and ordering applied to it
#[derive(Debug, Clone, Default)]
pub struct QueryAssembler {
    template: Option<String>,
    alias: Option<RootAlias>,
    explicit_alias: bool,
    appenders: Vec<String>,
    clauses: Vec<FilterClause>,
    sort: Option<Sort>,
    group_by: Option<GroupBy>,
    count_projection: Option<String>,
    syntax: PlaceholderSyntax,
}

impl QueryAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an assembler for `template`
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Configuration` if no alias can be derived.
    pub fn with_template(template: impl Into<String>) -> Result<Self, QueryError> {
        let mut assembler = Self::new();
        assembler.set_template(template)?;
        Ok(assembler)
    }

    /// Set the base template and derive its root alias
    ///
    /// An alias set through [`set_alias`](Self::set_alias) is kept.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Configuration` if the template is blank.
    pub fn set_template(&mut self, template: impl Into<String>) -> Result<(), QueryError> {
        let template = template.into();
        if !self.explicit_alias {
            self.alias = Some(RootAlias::from_template(&template)?);
        } else if template.trim().is_empty() {
            return Err(QueryError::configuration("query is not valid: template is empty"));
        }
        self.template = Some(template);
        Ok(())
    }

    /// Override the derived root alias, for templates the heuristic cannot read
    pub fn set_alias(&mut self, alias: &str) -> Result<(), QueryError> {
        self.alias = Some(RootAlias::explicit(alias)?);
        self.explicit_alias = true;
        Ok(())
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    pub fn alias(&self) -> Option<&RootAlias> {
        self.alias.as_ref()
    }

    /// Append a raw join fragment after the template
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Configuration` if no template is set yet.
    pub fn append_query(&mut self, fragment: impl Into<String>) -> Result<(), QueryError> {
        if self.template.is_none() {
            return Err(QueryError::configuration("You have to set query first"));
        }
        let fragment = fragment.into();
        if fragment.starts_with(char::is_whitespace) {
            self.appenders.push(fragment);
        } else {
            self.appenders.push(format!(" {fragment}"));
        }
        Ok(())
    }

    pub fn add_clause(&mut self, clause: FilterClause) {
        self.clauses.push(clause);
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn clear_clauses(&mut self) {
        self.clauses.clear();
    }

    pub fn set_sort(&mut self, sort: Option<Sort>) {
        self.sort = sort;
    }

    pub fn sort(&self) -> Option<&Sort> {
        self.sort.as_ref()
    }

    pub fn set_group_by(&mut self, group_by: Option<GroupBy>) {
        self.group_by = group_by;
    }

    pub fn group_by(&self) -> Option<&GroupBy> {
        self.group_by.as_ref()
    }

    /// Projection used by [`build_count`](Self::build_count) instead of `count(*)`
    pub fn set_count_projection(&mut self, projection: Option<String>) {
        self.count_projection = projection;
    }

    pub fn set_placeholder_syntax(&mut self, syntax: PlaceholderSyntax) {
        self.syntax = syntax;
    }

    pub fn placeholder_syntax(&self) -> &PlaceholderSyntax {
        &self.syntax
    }

    fn configured(&self) -> Result<(&str, &RootAlias), QueryError> {
        match (&self.template, &self.alias) {
            (Some(template), Some(alias)) => Ok((template, alias)),
            _ => Err(QueryError::configuration("You have to provide query")),
        }
    }

    fn apply_filters(
        &self,
        alias: &RootAlias,
        resolver: &dyn ExpressionResolver,
        text: &mut String,
    ) -> Result<Vec<sea_query::Value>, QueryError> {
        for fragment in &self.appenders {
            text.push_str(fragment);
        }
        PredicateCompiler::new(alias, resolver, &self.syntax).apply(&self.clauses, text)
    }

    fn apply_group_by(&self, alias: &RootAlias, text: &mut String) {
        if let Some(group_by) = &self.group_by {
            append_listed(text, &GROUP_BY_KEYWORD, "GROUP BY", &group_by.render(alias));
        }
    }

    /// Build the data query
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Configuration` if no template is set, and any
    /// error raised while resolving filter values.
    pub fn build(
        &self,
        resolver: &dyn ExpressionResolver,
        paging: &PaginationState,
    ) -> Result<Query, QueryError> {
        let (template, alias) = self.configured()?;
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::build_query_span(template).entered();

        let mut text = normalize_whitespace(template);
        let values = self.apply_filters(alias, resolver, &mut text)?;
        self.apply_group_by(alias, &mut text);
        if let Some(sort) = &self.sort {
            append_listed(&mut text, &ORDER_BY_KEYWORD, "ORDER BY", &sort.render(alias));
        }
        if let Some(max) = paging.max_results() {
            text.push_str(&format!(" limit {max}"));
        }
        if let Some(first) = paging.first_result().filter(|&first| first > 0) {
            text.push_str(&format!(" offset {first}"));
        }

        log::debug!("built query `{text}` with {} bound value(s)", values.len());
        #[cfg(feature = "metrics")]
        METRICS.record_build();
        Ok(Query::new(text, values))
    }

    /// Build the COUNT variant: same table clause, joins and filters, no
    /// ordering or paging
    ///
    /// A grouped query counts its groups: the grouped statement is wrapped as
    /// `select count(*) from (...) AS count_subquery`, so the projection
    /// override only applies to ungrouped counts.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Configuration` if no template is set or it has no
    /// `FROM` clause, and any error raised while resolving filter values.
    pub fn build_count(&self, resolver: &dyn ExpressionResolver) -> Result<Query, QueryError> {
        let (template, alias) = self.configured()?;
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::count_query_span(template).entered();

        let normalized = normalize_whitespace(template);
        let table_clause = COUNT_FROM
            .captures(&normalized)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| QueryError::configuration("query has no FROM clause to count"))?;
        let projection = self
            .count_projection
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_COUNT_PROJECTION);

        let grouped = self.group_by.as_ref().is_some_and(|g| !g.is_empty())
            || GROUP_BY_KEYWORD.is_match(table_clause);
        let inner_projection = if grouped { "1" } else { projection };

        let mut text = format!("select {inner_projection} from {table_clause}");
        let values = self.apply_filters(alias, resolver, &mut text)?;
        self.apply_group_by(alias, &mut text);
        if grouped {
            text = format!("select {DEFAULT_COUNT_PROJECTION} from ({text}) AS count_subquery");
        }

        log::debug!("built count query `{text}` with {} bound value(s)", values.len());
        #[cfg(feature = "metrics")]
        METRICS.record_build();
        Ok(Query::new(text, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{GroupOperand, LogicalOperand};
    use crate::resolve::{MapResolver, NoopResolver};
    use crate::sort::Direction;
    use sea_query::Value;

    fn employees() -> QueryAssembler {
        QueryAssembler::with_template("select e.* from Employee e").unwrap()
    }

    #[test]
    fn test_build_without_template_fails() {
        let assembler = QueryAssembler::new();
        let err = assembler.build(&NoopResolver, &PaginationState::new()).unwrap_err();
        assert!(matches!(err, QueryError::Configuration(_)));
        assert!(matches!(assembler.build_count(&NoopResolver), Err(QueryError::Configuration(_))));
    }

    #[test]
    fn test_blank_template_is_rejected() {
        assert!(matches!(QueryAssembler::with_template("  "), Err(QueryError::Configuration(_))));
    }

    #[test]
    fn test_append_query_requires_template() {
        let mut assembler = QueryAssembler::new();
        assert!(assembler.append_query("left join Dept d on d.id = e.dept_id").is_err());
    }

    #[test]
    fn test_template_whitespace_is_normalized() {
        let assembler = QueryAssembler::with_template("select e.*\r\nfrom Employee e\twhere e.active = true").unwrap();
        let query = assembler.build(&NoopResolver, &PaginationState::new()).unwrap();
        assert_eq!(query.text(), "select e.* from Employee e where e.active = true");
    }

    #[test]
    fn test_full_build() {
        let mut assembler = employees();
        assembler
            .append_query("left join Dept d on d.id = e.dept_id")
            .unwrap();
        assembler.add_clause(FilterClause::new().eq("status", "ACTIVE"));
        assembler.add_clause(
            FilterClause::new()
                .or()
                .join_with(LogicalOperand::And)
                .group(GroupOperand::Group)
                .eq("d.name", "IT")
                .eq("d.name", "OPS"),
        );
        assembler.set_group_by(Some(GroupBy::by("dept_id")));
        assembler.set_sort(Some(Sort::by("name", Direction::Asc).desc("d.name")));

        let mut paging = PaginationState::with_max_results(10);
        paging.set_page_number(Some(2));
        let query = assembler.build(&NoopResolver, &paging).unwrap();
        assert_eq!(
            query.text(),
            "select e.* from Employee e left join Dept d on d.id = e.dept_id \
             WHERE e.status = ? AND (d.name = ? OR d.name = ?) \
             GROUP BY e.dept_id ORDER BY e.name ASC, d.name DESC limit 10 offset 20"
        );
        assert_eq!(
            query.values(),
            &[Value::from("ACTIVE"), Value::from("IT"), Value::from("OPS")]
        );
    }

    #[test]
    fn test_existing_where_is_continued() {
        let mut assembler =
            QueryAssembler::with_template("select * from Employee e where e.active = true").unwrap();
        assembler.add_clause(FilterClause::new().gt("age", 30i32));
        let query = assembler.build(&NoopResolver, &PaginationState::new()).unwrap();
        assert_eq!(query.text(), "select * from Employee e where e.active = true AND e.age > ?");
        assert_eq!(query.values(), &[Value::from(30i32)]);
    }

    #[test]
    fn test_existing_order_by_is_continued() {
        let mut assembler = QueryAssembler::with_template("select * from Employee e order by e.id").unwrap();
        assembler.set_sort(Some(Sort::new().desc("age")));
        let query = assembler.build(&NoopResolver, &PaginationState::new()).unwrap();
        assert_eq!(query.text(), "select * from Employee e order by e.id, e.age DESC");
    }

    #[test]
    fn test_offset_only_when_positive() {
        let assembler = employees();
        let mut paging = PaginationState::with_max_results(5);
        paging.set_first_result(Some(0));
        let query = assembler.build(&NoopResolver, &paging).unwrap();
        assert_eq!(query.text(), "select e.* from Employee e limit 5");

        let mut paging = PaginationState::new();
        paging.set_first_result(Some(15));
        let query = assembler.build(&NoopResolver, &paging).unwrap();
        assert_eq!(query.text(), "select e.* from Employee e offset 15");
    }

    #[test]
    fn test_count_keeps_filters_and_grouping() {
        let mut assembler = employees();
        assembler.append_query("inner join Dept d on d.id = e.dept_id").unwrap();
        assembler.add_clause(FilterClause::new().like("name", "an"));
        assembler.set_group_by(Some(GroupBy::by("dept_id")));
        assembler.set_sort(Some(Sort::new().asc("name")));

        let count = assembler.build_count(&NoopResolver).unwrap();
        assert_eq!(
            count.text(),
            "select count(*) from (select 1 from Employee e inner join Dept d on d.id = e.dept_id \
             WHERE e.name LIKE ? GROUP BY e.dept_id) AS count_subquery"
        );
        assert_eq!(count.values(), &[Value::from("%an%")]);
    }

    #[test]
    fn test_count_of_grouped_template_counts_groups() {
        let mut assembler =
            QueryAssembler::with_template("select e.dept_id, count(*) from Employee e group by e.dept_id").unwrap();
        assembler.set_count_projection(Some("count(distinct e.id)".to_string()));
        let count = assembler.build_count(&NoopResolver).unwrap();
        assert_eq!(
            count.text(),
            "select count(*) from (select 1 from Employee e group by e.dept_id) AS count_subquery"
        );
    }

    #[test]
    fn test_ungrouped_count_stays_flat() {
        let mut assembler = employees();
        assembler.add_clause(FilterClause::new().eq("status", "ACTIVE"));
        assembler.set_group_by(Some(GroupBy::new()));
        let count = assembler.build_count(&NoopResolver).unwrap();
        assert_eq!(count.text(), "select count(*) from Employee e WHERE e.status = ?");
    }

    #[test]
    fn test_count_projection_override() {
        let mut assembler = employees();
        assembler.set_count_projection(Some("count(distinct e.id)".to_string()));
        let count = assembler.build_count(&NoopResolver).unwrap();
        assert_eq!(count.text(), "select count(distinct e.id) from Employee e");
    }

    #[test]
    fn test_count_requires_from() {
        let mut assembler = QueryAssembler::new();
        assembler.set_alias("e").unwrap();
        assembler.set_template("Employee e").unwrap();
        assert!(matches!(assembler.build_count(&NoopResolver), Err(QueryError::Configuration(_))));
    }

    #[test]
    fn test_explicit_alias_survives_template_change() {
        let mut assembler = QueryAssembler::new();
        assembler.set_alias("emp").unwrap();
        assembler
            .set_template("select * from (select * from Employee) emp_view")
            .unwrap();
        assert_eq!(assembler.alias().unwrap().as_str(), "emp");
    }

    #[test]
    fn test_rebuild_is_identical() {
        let resolver = MapResolver::new().with("#{dept}", "IT");
        let mut assembler = employees();
        assembler.add_clause(FilterClause::new().eq("dept", "#{dept}").is_in("code", vec!["A", "B"]));
        let paging = PaginationState::with_max_results(3);
        let first = assembler.build(&resolver, &paging).unwrap();
        let second = assembler.build(&resolver, &paging).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.text(),
            "select e.* from Employee e WHERE e.dept = ? AND e.code IN ( 'A', 'B' ) limit 3"
        );
    }
}
