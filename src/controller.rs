//! Query controller: an assembler plus paging state and cached results.
//!
//! The controller owns everything a paged listing needs between requests. Each
//! [`build`](QueryController::build) returns a fresh [`Query`]; the row count
//! and the last fetched page are cached in a [`PaginationCache`] that is only
//! cleared through [`refresh`](QueryController::refresh), either called by the
//! caller or because late-bound filter values drifted since the count was taken.

use crate::assembler::QueryAssembler;
use crate::config::ControllerConfig;
use crate::dirty::DirtyTracker;
use crate::error::QueryError;
use crate::executor::QueryExecutor;
use crate::filter::FilterClause;
use crate::pagination::{PaginationCache, PaginationState};
use crate::query::Query;
use crate::resolve::ExpressionResolver;
use crate::sort::{GroupBy, Sort};
use sea_query::Value;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;

/// Default filter clauses applied when the caller configured none
pub trait Restrictions {
    fn restrictions(&self) -> Vec<FilterClause>;
}

impl<F> Restrictions for F
where
    F: Fn() -> Vec<FilterClause>,
{
    fn restrictions(&self) -> Vec<FilterClause> {
        self()
    }
}

/// Paged query over a template, generic over the executor's row type
pub struct QueryController<R> {
    assembler: QueryAssembler,
    paging: PaginationState,
    cache: PaginationCache<R>,
    dirty: DirtyTracker,
    config: ControllerConfig,
    query_param_values: Vec<Value>,
    restrictions: Option<Box<dyn Restrictions>>,
    restrictions_checked: bool,
}

impl<R> Default for QueryController<R> {
    fn default() -> Self {
        Self::from_config(ControllerConfig::default())
    }
}

impl<R> QueryController<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a controller with the page size, count projection and
    /// placeholder syntax of `config`
    pub fn from_config(config: ControllerConfig) -> Self {
        let mut assembler = QueryAssembler::new();
        assembler.set_placeholder_syntax(config.placeholder_syntax());
        assembler.set_count_projection(config.count_projection.clone());

        let mut paging = PaginationState::new();
        paging.set_max_results(config.default_max_results);

        Self {
            assembler,
            paging,
            cache: PaginationCache::new(),
            dirty: DirtyTracker::new(),
            config,
            query_param_values: Vec::new(),
            restrictions: None,
            restrictions_checked: false,
        }
    }

    /// Set the base template
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Configuration` if no root alias can be derived.
    pub fn set_query(&mut self, template: impl Into<String>) -> Result<&mut Self, QueryError> {
        self.assembler.set_template(template)?;
        self.refresh();
        Ok(self)
    }

    /// Use `alias` as the root alias instead of reading it from the template
    pub fn with_alias(&mut self, alias: &str) -> Result<&mut Self, QueryError> {
        self.assembler.set_alias(alias)?;
        Ok(self)
    }

    /// Append a join fragment after the template
    pub fn append_query(&mut self, fragment: impl Into<String>) -> Result<&mut Self, QueryError> {
        self.assembler.append_query(fragment)?;
        self.refresh();
        Ok(self)
    }

    pub fn add_filter_clause(&mut self, clause: FilterClause) -> &mut Self {
        self.assembler.add_clause(clause);
        self.refresh();
        self
    }

    pub fn set_restrictions(&mut self, restrictions: impl Restrictions + 'static) -> &mut Self {
        self.restrictions = Some(Box::new(restrictions));
        self.restrictions_checked = false;
        self
    }

    pub fn add_order_by(&mut self, sort: Sort) -> &mut Self {
        let merged = match self.assembler.sort() {
            Some(current) => sort
                .orders()
                .iter()
                .fold(current.clone(), |acc, order| acc.then(order.property.clone(), order.direction)),
            None => sort,
        };
        self.assembler.set_sort(Some(merged));
        self
    }

    pub fn add_group_by(&mut self, group_by: GroupBy) -> &mut Self {
        let merged = match self.assembler.group_by() {
            Some(current) => group_by
                .properties()
                .iter()
                .fold(current.clone(), |acc, property| acc.then(property.clone())),
            None => group_by,
        };
        self.assembler.set_group_by(Some(merged));
        self.refresh();
        self
    }

    /// Set the page size, clamped to the configured `max_page_size`
    pub fn set_max_results(&mut self, max_results: Option<u64>) -> &mut Self {
        self.paging
            .set_max_results(max_results.map(|max| self.config.clamp_page_size(max)));
        self
    }

    pub fn set_first_result(&mut self, first_result: Option<u64>) -> &mut Self {
        self.paging.set_first_result(first_result);
        self
    }

    pub fn set_page_number(&mut self, page_number: Option<i64>) -> &mut Self {
        self.paging.set_page_number(page_number);
        self
    }

    /// Positional values bound ahead of the compiled filter values
    pub fn set_query_param_values(&mut self, values: Vec<Value>) -> &mut Self {
        self.query_param_values = values;
        self
    }

    pub fn query_param_values(&self) -> &[Value] {
        &self.query_param_values
    }

    pub fn assembler(&self) -> &QueryAssembler {
        &self.assembler
    }

    pub fn paging(&self) -> &PaginationState {
        &self.paging
    }

    pub fn cache(&self) -> &PaginationCache<R> {
        &self.cache
    }

    pub fn max_results(&self) -> Option<u64> {
        self.paging.max_results()
    }

    pub fn first_result(&self) -> Option<u64> {
        self.paging.first_result()
    }

    pub fn page_number(&self) -> u64 {
        self.paging.page_number()
    }

    fn apply_restrictions(&mut self) {
        if self.restrictions_checked {
            return;
        }
        self.restrictions_checked = true;
        if !self.assembler.clauses().is_empty() {
            return;
        }
        if let Some(restrictions) = &self.restrictions {
            let clauses = restrictions.restrictions();
            log::debug!("applying {} restriction clause(s)", clauses.len());
            for clause in clauses {
                self.assembler.add_clause(clause);
            }
        }
    }

    /// Build the data query for the current page
    ///
    /// # Errors
    ///
    /// See [`QueryAssembler::build`].
    pub fn build(&mut self, resolver: &dyn ExpressionResolver) -> Result<Query, QueryError> {
        self.apply_restrictions();
        self.assembler.build(resolver, &self.paging)
    }

    /// Build the COUNT variant of the current filters
    ///
    /// # Errors
    ///
    /// See [`QueryAssembler::build_count`].
    pub fn build_count(&mut self, resolver: &dyn ExpressionResolver) -> Result<Query, QueryError> {
        self.apply_restrictions();
        self.assembler.build_count(resolver)
    }

    fn bind_values(&self, query: &Query) -> Vec<Value> {
        self.query_param_values
            .iter()
            .chain(query.values())
            .cloned()
            .collect()
    }

    fn invalidate_if_dirty(&mut self, resolver: &dyn ExpressionResolver) -> Result<(), QueryError> {
        if self.cache.result_count().is_none() {
            return Ok(());
        }
        let syntax = self.assembler.placeholder_syntax();
        if self.dirty.is_dirty(self.assembler.clauses(), resolver, syntax)? {
            log::debug!("late-bound filter values changed, dropping cached results");
            #[cfg(feature = "metrics")]
            METRICS.record_invalidation();
            self.refresh();
        }
        Ok(())
    }

    /// Run the data query and cache the fetched page
    ///
    /// # Errors
    ///
    /// Returns build errors as they are and executor failures as
    /// `QueryError::Execution`.
    pub fn execute<Ex>(&mut self, executor: &Ex, resolver: &dyn ExpressionResolver) -> Result<&[R], QueryError>
    where
        Ex: QueryExecutor<Row = R>,
    {
        self.invalidate_if_dirty(resolver)?;
        let query = self.build(resolver)?;
        let params = self.bind_values(&query);
        let rows = executor.query_all(query.text(), &params)?;
        log::debug!("fetched {} row(s)", rows.len());
        Ok(self.cache.store_list(rows))
    }

    /// Rows of the last executed page, if any
    pub fn result_list(&self) -> Option<&[R]> {
        self.cache.result_list()
    }

    /// Total row count across all pages
    ///
    /// The count is computed once and reused until the cache is refreshed or a
    /// late-bound filter value resolves differently from when it was taken.
    ///
    /// # Errors
    ///
    /// Returns build errors as they are and executor failures as
    /// `QueryError::Execution`.
    pub fn result_count<Ex>(&mut self, executor: &Ex, resolver: &dyn ExpressionResolver) -> Result<u64, QueryError>
    where
        Ex: QueryExecutor<Row = R>,
    {
        self.invalidate_if_dirty(resolver)?;
        if let Some(count) = self.cache.result_count() {
            return Ok(count);
        }

        let query = self.build_count(resolver)?;
        let params = self.bind_values(&query);
        #[cfg(feature = "metrics")]
        METRICS.record_count_query();
        let count = executor
            .query_count(query.text(), &params)?
            .and_then(|count| u64::try_from(count).ok())
            .unwrap_or(0);

        self.dirty
            .capture(self.assembler.clauses(), resolver, self.assembler.placeholder_syntax())?;
        self.cache.store_count(count);
        Ok(count)
    }

    /// Number of pages, `None` without a page size
    pub fn page_count<Ex>(&mut self, executor: &Ex, resolver: &dyn ExpressionResolver) -> Result<Option<u64>, QueryError>
    where
        Ex: QueryExecutor<Row = R>,
    {
        if self.paging.max_results().is_none() {
            return Ok(None);
        }
        let count = self.result_count(executor, resolver)?;
        Ok(self.paging.page_count(count))
    }

    /// Offset of the last page, `None` without a page size
    pub fn last_first_result<Ex>(
        &mut self,
        executor: &Ex,
        resolver: &dyn ExpressionResolver,
    ) -> Result<Option<u64>, QueryError>
    where
        Ex: QueryExecutor<Row = R>,
    {
        if self.paging.max_results().is_none() {
            return Ok(None);
        }
        let count = self.result_count(executor, resolver)?;
        Ok(self.paging.last_first_result(count))
    }

    pub fn next_first_result(&self) -> Option<u64> {
        self.paging.next_first_result()
    }

    pub fn previous_first_result(&self) -> Option<u64> {
        self.paging.previous_first_result()
    }

    /// Whether the last fetched page came back full
    pub fn has_next(&self) -> bool {
        self.paging.has_next(self.cache.fetched_rows())
    }

    pub fn has_previous(&self) -> bool {
        self.paging.has_previous(self.cache.fetched_rows())
    }

    /// Clear paging, ordering, grouping and extra parameters, back to page zero
    pub fn reset(&mut self) -> &mut Self {
        self.paging.reset();
        self.assembler.set_sort(None);
        self.assembler.set_group_by(None);
        self.query_param_values.clear();
        self.refresh();
        self
    }

    /// Drop the cached row count and page
    pub fn refresh(&mut self) -> &mut Self {
        self.cache.invalidate();
        self.dirty.clear();
        self
    }
}
