use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{
    db::TrendingStore,
    error::AppResult,
    models::{Drama, NewTrendingRecord, TrendingRecord},
};

/// Default number of trending searches shown
pub const DEFAULT_TRENDING_LIMIT: usize = 5;

/// One successful search waiting to be counted
struct SearchHit {
    search_term: String,
    top_result: Drama,
}

/// Records successful searches against the trending store
///
/// Writes go through a single background task, so hits for the same term are
/// applied in the order they were queued.
#[derive(Clone)]
pub struct TrendingRecorder {
    store: Arc<dyn TrendingStore>,
    image_base_url: Arc<str>,
    write_tx: mpsc::UnboundedSender<SearchHit>,
}

/// Handle for gracefully shutting down the trending writer
pub struct TrendingRecorderHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl TrendingRecorderHandle {
    /// Stops the writer after flushing every hit queued so far
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Trending writer task failed");
        }
        tracing::info!("Trending writer stopped");
    }
}

impl TrendingRecorder {
    /// Creates a recorder and spawns its writer task
    pub fn new(
        store: Arc<dyn TrendingStore>,
        image_base_url: impl Into<String>,
    ) -> (Self, TrendingRecorderHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let image_base_url: Arc<str> = Arc::from(image_base_url.into());

        let recorder = Self {
            store,
            image_base_url,
            write_tx,
        };

        let writer = recorder.clone_without_sender();
        let task = tokio::spawn(async move {
            writer.writer_task(write_rx, shutdown_rx).await;
        });

        (recorder, TrendingRecorderHandle { shutdown_tx, task })
    }

    /// Prefix used to build poster URLs for new records
    pub fn image_base_url(&self) -> &str {
        &self.image_base_url
    }

    /// Counts one successful search and waits for the store
    ///
    /// Blank terms are ignored.
    pub async fn record(&self, search_term: &str, top_result: &Drama) -> AppResult<()> {
        if search_term.trim().is_empty() {
            return Ok(());
        }

        count_hit(
            self.store.as_ref(),
            &self.image_base_url,
            search_term,
            top_result,
        )
        .await
    }

    /// Queues a hit without waiting; store failures are only logged
    pub fn record_in_background(&self, search_term: &str, top_result: &Drama) {
        if search_term.trim().is_empty() {
            return;
        }

        let hit = SearchHit {
            search_term: search_term.to_string(),
            top_result: top_result.clone(),
        };

        if let Err(e) = self.write_tx.send(hit) {
            tracing::error!(error = %e, "Failed to queue trending hit");
        }
    }

    /// The writer must not hold a sender, or the channel never closes
    fn clone_without_sender(&self) -> TrendingWriter {
        TrendingWriter {
            store: self.store.clone(),
            image_base_url: self.image_base_url.clone(),
        }
    }
}

struct TrendingWriter {
    store: Arc<dyn TrendingStore>,
    image_base_url: Arc<str>,
}

impl TrendingWriter {
    async fn writer_task(
        self,
        mut write_rx: mpsc::UnboundedReceiver<SearchHit>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(store = self.store.name(), "Trending writer task started");

        loop {
            tokio::select! {
                maybe_hit = write_rx.recv() => {
                    match maybe_hit {
                        Some(hit) => self.apply(hit).await,
                        None => break,
                    }
                }
                Some(()) = shutdown_rx.recv() => {
                    let mut flushed = 0;
                    while let Ok(hit) = write_rx.try_recv() {
                        self.apply(hit).await;
                        flushed += 1;
                    }
                    tracing::info!(flushed, "Trending writer flushed pending hits");
                    break;
                }
            }
        }
    }

    async fn apply(&self, hit: SearchHit) {
        let result = count_hit(
            self.store.as_ref(),
            &self.image_base_url,
            &hit.search_term,
            &hit.top_result,
        )
        .await;

        if let Err(e) = result {
            tracing::error!(
                error = %e,
                search_term = %hit.search_term,
                store = self.store.name(),
                "Failed to update trending count"
            );
        }
    }
}

/// Creates the record with count 1 on first sight, otherwise increments it
async fn count_hit(
    store: &dyn TrendingStore,
    image_base_url: &str,
    search_term: &str,
    top_result: &Drama,
) -> AppResult<()> {
    match store.find_by_term(search_term).await? {
        Some(existing) => {
            let updated = store.increment(&existing).await?;
            tracing::debug!(
                search_term = %search_term,
                count = updated.count,
                store = store.name(),
                "Trending count incremented"
            );
        }
        None => {
            let record =
                NewTrendingRecord::from_top_result(search_term, top_result, image_base_url);
            store.create(record).await?;
            tracing::debug!(
                search_term = %search_term,
                store = store.name(),
                "Trending record created"
            );
        }
    }

    Ok(())
}

/// Top trending searches, or nothing if the store is unavailable
pub async fn top_searches(store: &dyn TrendingStore, limit: usize) -> Vec<TrendingRecord> {
    match store.list_top(limit).await {
        Ok(records) => records,
        Err(e) => {
            tracing::error!(error = %e, store = store.name(), "Failed to load trending searches");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryTrendingStore, MockTrendingStore};
    use crate::error::AppError;

    const IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";

    fn squid_game() -> Drama {
        Drama {
            id: 93405,
            name: "Squid Game".to_string(),
            original_name: Some("오징어 게임".to_string()),
            original_language: "ko".to_string(),
            poster_path: Some("/squid.jpg".to_string()),
            overview: None,
            first_air_date: Some("2021-09-17".to_string()),
            vote_average: Some(7.8),
        }
    }

    #[tokio::test]
    async fn test_first_hit_creates_with_count_one() {
        let store = Arc::new(MemoryTrendingStore::new());
        let (recorder, _handle) = TrendingRecorder::new(store.clone(), IMAGE_BASE);

        recorder.record("squid", &squid_game()).await.unwrap();

        let record = store.find_by_term("squid").await.unwrap().unwrap();
        assert_eq!(record.count, 1);
        assert_eq!(record.name, "Squid Game");
        assert_eq!(record.drama_id, 93405);
        assert_eq!(
            record.poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/squid.jpg")
        );
    }

    #[tokio::test]
    async fn test_repeat_hits_increment_by_one() {
        let store = Arc::new(MemoryTrendingStore::new());
        let (recorder, _handle) = TrendingRecorder::new(store.clone(), IMAGE_BASE);

        for expected in 1..=3 {
            recorder.record("squid", &squid_game()).await.unwrap();
            let record = store.find_by_term("squid").await.unwrap().unwrap();
            assert_eq!(record.count, expected);
        }
    }

    #[tokio::test]
    async fn test_blank_term_not_recorded() {
        let mut store = MockTrendingStore::new();
        store.expect_find_by_term().never();
        store.expect_create().never();
        store.expect_name().return_const("mock");

        let (recorder, _handle) = TrendingRecorder::new(Arc::new(store), IMAGE_BASE);
        tokio_test::assert_ok!(recorder.record("  ", &squid_game()).await);
    }

    #[tokio::test]
    async fn test_record_surfaces_store_error() {
        let mut store = MockTrendingStore::new();
        store
            .expect_find_by_term()
            .returning(|_| Err(AppError::Store("unreachable".to_string())));
        store.expect_name().return_const("mock");

        let (recorder, _handle) = TrendingRecorder::new(Arc::new(store), IMAGE_BASE);
        let err = recorder.record("squid", &squid_game()).await.unwrap_err();
        assert!(err.is_store());
    }

    #[tokio::test]
    async fn test_background_hits_flushed_on_shutdown() {
        let store = Arc::new(MemoryTrendingStore::new());
        let (recorder, handle) = TrendingRecorder::new(store.clone(), IMAGE_BASE);

        recorder.record_in_background("squid", &squid_game());
        recorder.record_in_background("squid", &squid_game());
        recorder.record_in_background("", &squid_game());
        handle.shutdown().await;

        let record = store.find_by_term("squid").await.unwrap().unwrap();
        assert_eq!(record.count, 2);
        assert!(store.find_by_term("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_background_store_failure_is_swallowed() {
        let mut store = MockTrendingStore::new();
        store
            .expect_find_by_term()
            .times(1)
            .returning(|_| Err(AppError::Store("write refused".to_string())));
        store.expect_name().return_const("mock");

        let (recorder, handle) = TrendingRecorder::new(Arc::new(store), IMAGE_BASE);
        recorder.record_in_background("squid", &squid_game());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_top_searches_falls_back_to_empty() {
        let mut store = MockTrendingStore::new();
        store
            .expect_list_top()
            .returning(|_| Err(AppError::Store("offline".to_string())));
        store.expect_name().return_const("mock");

        assert!(top_searches(&store, DEFAULT_TRENDING_LIMIT).await.is_empty());
    }

    #[tokio::test]
    async fn test_top_searches_respects_limit() {
        let store = Arc::new(MemoryTrendingStore::new());
        let (recorder, _handle) = TrendingRecorder::new(store.clone(), IMAGE_BASE);
        for term in ["a", "b", "c", "d", "e", "f", "g"] {
            recorder.record(term, &squid_game()).await.unwrap();
        }

        assert_eq!(top_searches(store.as_ref(), 5).await.len(), 5);
    }
}
