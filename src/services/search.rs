use crate::{
    error::AppResult,
    models::Drama,
    services::{providers::DramaProvider, trending::TrendingRecorder},
};

/// One-shot drama search
///
/// Delegates to the provider, then queues a trending hit for the top result
/// of a non-empty query. Trending failures never reach the caller.
pub async fn search_dramas(
    provider: &dyn DramaProvider,
    recorder: &TrendingRecorder,
    query: &str,
) -> AppResult<Vec<Drama>> {
    let dramas = provider.fetch_dramas(query).await?;

    if let Some(top) = dramas.first() {
        recorder.record_in_background(query, top);
    }

    Ok(dramas)
}
