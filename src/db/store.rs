use crate::{
    error::AppResult,
    models::{NewTrendingRecord, TrendingRecord},
};

/// Persistence for trending search counters
///
/// Backends own the schema; callers only see records keyed by the exact
/// search term.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TrendingStore: Send + Sync {
    /// Look up the record for an exact search term
    async fn find_by_term(&self, search_term: &str) -> AppResult<Option<TrendingRecord>>;

    /// Create a record with count = 1
    async fn create(&self, record: NewTrendingRecord) -> AppResult<TrendingRecord>;

    /// Add one to an existing record's count, returning the updated record
    async fn increment(&self, record: &TrendingRecord) -> AppResult<TrendingRecord>;

    /// Up to `limit` records, highest count first
    async fn list_top(&self, limit: usize) -> AppResult<Vec<TrendingRecord>>;

    /// Backend name for logging and debugging
    fn name(&self) -> &'static str;
}
