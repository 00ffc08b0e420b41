/// Drama metadata provider abstraction
///
/// The search path depends only on this trait, so the TMDB client can be
/// swapped for a fake in tests or another catalog later.
use crate::{error::AppResult, models::Drama};

pub mod tmdb;

pub use tmdb::{DramaEndpoint, TmdbProvider};

/// Trait for drama metadata providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DramaProvider: Send + Sync {
    /// Fetch Korean-language dramas for a query
    ///
    /// An empty (or blank) query means "discover popular"; anything else is a
    /// free-text search. Only entries whose original language is Korean are
    /// returned, in provider order.
    async fn fetch_dramas(&self, query: &str) -> AppResult<Vec<Drama>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
