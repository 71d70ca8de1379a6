//! Paging arithmetic and cached paging results.
//!
//! [`PaginationState`] is pure bookkeeping over first result, page size and
//! page number. [`PaginationCache`] holds the lazily computed row count and the
//! last fetched page; it is only ever cleared through [`PaginationCache::invalidate`].

/// First-result, page-size and page-number bookkeeping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaginationState {
    first_result: Option<u64>,
    max_results: Option<u64>,
    page_number: Option<u64>,
}

impl PaginationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_results(max_results: u64) -> Self {
        Self {
            max_results: Some(max_results),
            ..Self::default()
        }
    }

    pub fn set_first_result(&mut self, first_result: Option<u64>) {
        self.first_result = first_result;
    }

    pub fn set_max_results(&mut self, max_results: Option<u64>) {
        self.max_results = max_results;
    }

    /// Select a zero-based page; negative numbers clamp to the first page.
    pub fn set_page_number(&mut self, page_number: Option<i64>) {
        self.page_number = page_number.map(|page| page.max(0).unsigned_abs());
    }

    pub fn max_results(&self) -> Option<u64> {
        self.max_results.filter(|&max| max > 0)
    }

    /// Zero-based page number, `0` when none was set
    pub fn page_number(&self) -> u64 {
        self.page_number.unwrap_or(0)
    }

    /// Offset of the current page
    ///
    /// A selected page number takes precedence over an explicit first result
    /// as long as a page size is set.
    pub fn first_result(&self) -> Option<u64> {
        match (self.page_number, self.max_results()) {
            (Some(page), Some(max)) => Some(page.saturating_mul(max)),
            _ => self.first_result,
        }
    }

    /// `ceil(result_count / max_results)`, `None` without a page size
    pub fn page_count(&self, result_count: u64) -> Option<u64> {
        self.max_results().map(|max| result_count.div_ceil(max))
    }

    pub fn next_first_result(&self) -> Option<u64> {
        self.max_results()
            .map(|max| self.first_result().unwrap_or(0).saturating_add(max))
    }

    pub fn previous_first_result(&self) -> Option<u64> {
        self.max_results().map(|max| {
            let first = self.first_result().unwrap_or(0);
            if max >= first {
                0
            } else {
                first - max
            }
        })
    }

    /// Offset of the last page, `None` without a page size
    pub fn last_first_result(&self, result_count: u64) -> Option<u64> {
        let max = self.max_results()?;
        self.page_count(result_count)
            .map(|pages| pages.saturating_sub(1).saturating_mul(max))
    }

    /// A previous page exists when the current page is not the first and it
    /// returned rows.
    pub fn has_previous(&self, fetched_rows: Option<usize>) -> bool {
        matches!(self.first_result(), Some(first) if first != 0) && fetched_rows.is_some_and(|n| n > 0)
    }

    /// A next page is assumed when the current page came back full
    ///
    /// A page that is exactly the last one and exactly full still reports a
    /// next page; fetch `max_results + 1` rows if that matters.
    pub fn has_next(&self, fetched_rows: Option<usize>) -> bool {
        match (fetched_rows, self.max_results()) {
            (Some(rows), Some(max)) => rows > 0 && rows as u64 >= max,
            _ => false,
        }
    }

    /// Clear offset, page size and page selection.
    pub fn reset(&mut self) {
        self.first_result = None;
        self.max_results = None;
        self.page_number = None;
    }
}

/// Row count and fetched rows cached between builds
#[derive(Debug)]
pub struct PaginationCache<R> {
    result_count: Option<u64>,
    result_list: Option<Vec<R>>,
}

impl<R> Default for PaginationCache<R> {
    fn default() -> Self {
        Self {
            result_count: None,
            result_list: None,
        }
    }
}

impl<R> PaginationCache<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn result_count(&self) -> Option<u64> {
        self.result_count
    }

    pub fn result_list(&self) -> Option<&[R]> {
        self.result_list.as_deref()
    }

    /// Number of rows in the cached page, if one was fetched
    pub fn fetched_rows(&self) -> Option<usize> {
        self.result_list.as_ref().map(Vec::len)
    }

    pub fn store_count(&mut self, count: u64) {
        self.result_count = Some(count);
    }

    pub fn store_list(&mut self, rows: Vec<R>) -> &[R] {
        self.result_list.insert(rows)
    }

    /// Drop the cached count and page.
    pub fn invalidate(&mut self) {
        self.result_count = None;
        self.result_list = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count() {
        let state = PaginationState::with_max_results(5);
        assert_eq!(state.page_count(10), Some(2));
        assert_eq!(state.page_count(11), Some(3));
        assert_eq!(state.page_count(0), Some(0));
        assert_eq!(PaginationState::new().page_count(10), None);
    }

    #[test]
    fn test_page_number_takes_precedence() {
        let mut state = PaginationState::with_max_results(20);
        state.set_first_result(Some(7));
        assert_eq!(state.first_result(), Some(7));
        state.set_page_number(Some(3));
        assert_eq!(state.first_result(), Some(60));
    }

    #[test]
    fn test_page_number_without_page_size_keeps_first_result() {
        let mut state = PaginationState::new();
        state.set_first_result(Some(7));
        state.set_page_number(Some(3));
        assert_eq!(state.first_result(), Some(7));
    }

    #[test]
    fn test_negative_page_number_clamps() {
        let mut state = PaginationState::with_max_results(10);
        state.set_page_number(Some(-4));
        assert_eq!(state.page_number(), 0);
        assert_eq!(state.first_result(), Some(0));
    }

    #[test]
    fn test_navigation() {
        let mut state = PaginationState::with_max_results(10);
        state.set_first_result(Some(25));
        assert_eq!(state.next_first_result(), Some(35));
        assert_eq!(state.previous_first_result(), Some(15));

        state.set_first_result(Some(10));
        assert_eq!(state.previous_first_result(), Some(0));

        state.set_first_result(None);
        assert_eq!(state.next_first_result(), Some(10));
        assert_eq!(state.previous_first_result(), Some(0));

        assert_eq!(state.last_first_result(45), Some(40));
        assert_eq!(state.last_first_result(0), Some(0));
        assert_eq!(PaginationState::new().last_first_result(45), None);
    }

    #[test]
    fn test_has_previous() {
        let mut state = PaginationState::with_max_results(10);
        state.set_first_result(Some(10));
        assert!(state.has_previous(Some(3)));
        assert!(!state.has_previous(Some(0)));
        assert!(!state.has_previous(None));
        state.set_first_result(Some(0));
        assert!(!state.has_previous(Some(3)));
    }

    #[test]
    fn test_has_next_reports_full_pages() {
        let state = PaginationState::with_max_results(10);
        assert!(state.has_next(Some(10)));
        assert!(!state.has_next(Some(9)));
        assert!(!state.has_next(None));
        assert!(!PaginationState::new().has_next(Some(10)));
    }

    #[test]
    fn test_reset() {
        let mut state = PaginationState::with_max_results(10);
        state.set_page_number(Some(2));
        state.reset();
        assert_eq!(state.max_results(), None);
        assert_eq!(state.first_result(), None);
        assert_eq!(state.page_number(), 0);
    }

    #[test]
    fn test_first_result_after_reset() {
        let mut state = PaginationState::with_max_results(10);
        state.set_page_number(Some(2));
        state.reset();
        state.set_max_results(Some(10));
        state.set_first_result(Some(30));
        assert_eq!(state.first_result(), Some(30));
        assert_eq!(state.next_first_result(), Some(40));
        assert!(state.has_previous(Some(10)));
    }

    #[test]
    fn test_cache_invalidate() {
        let mut cache: PaginationCache<u32> = PaginationCache::new();
        cache.store_count(12);
        assert_eq!(cache.store_list(vec![1, 2]), &[1, 2]);
        assert_eq!(cache.fetched_rows(), Some(2));
        cache.invalidate();
        assert_eq!(cache.result_count(), None);
        assert!(cache.result_list().is_none());
    }
}
