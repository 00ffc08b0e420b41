use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::services::{
    debounce::Debounced,
    providers::DramaProvider,
    trending::TrendingRecorder,
    view::{RequestId, SearchView, ViewEvent},
};

/// Request id of the discover query issued when a session starts
const MOUNT_REQUEST: RequestId = 1;

/// One client's live search: raw input in, debounced searches out
///
/// Typed input goes in through [`SearchSession::set_query`]; the driver task
/// debounces it, runs the search and folds the outcome into the view. Dropping
/// the session stops the driver.
pub struct SearchSession {
    id: Uuid,
    input_tx: watch::Sender<String>,
    view_rx: watch::Receiver<SearchView>,
    driver: JoinHandle<()>,
}

impl SearchSession {
    /// Starts a session; the mount query (empty, i.e. discover) is issued at once
    /// and the returned session is already loading it
    pub fn start(
        provider: Arc<dyn DramaProvider>,
        recorder: TrendingRecorder,
        debounce: Duration,
    ) -> Self {
        let id = Uuid::new_v4();
        let (input_tx, input_rx) = watch::channel(String::new());
        let mount = SearchView::default().reduce(ViewEvent::QueryIssued {
            request_id: MOUNT_REQUEST,
            query: String::new(),
        });
        let (view_tx, view_rx) = watch::channel(mount);

        let driver = tokio::spawn(drive(
            id,
            Debounced::new(input_rx, debounce),
            provider,
            recorder,
            Arc::new(view_tx),
        ));

        tracing::info!(session_id = %id, "Search session started");

        Self {
            id,
            input_tx,
            view_rx,
            driver,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Pushes raw input; unchanged text does not restart the debounce timer
    pub fn set_query(&self, query: impl Into<String>) {
        let query = query.into();
        self.input_tx.send_if_modified(|current| {
            if *current == query {
                false
            } else {
                *current = query;
                true
            }
        });
    }

    /// Snapshot of the current view
    pub fn view(&self) -> SearchView {
        self.view_rx.borrow().clone()
    }

    /// Receiver notified on every view change
    pub fn subscribe(&self) -> watch::Receiver<SearchView> {
        self.view_rx.clone()
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        self.driver.abort();
        tracing::debug!(session_id = %self.id, "Search session stopped");
    }
}

async fn drive(
    session_id: Uuid,
    mut input: Debounced<String>,
    provider: Arc<dyn DramaProvider>,
    recorder: TrendingRecorder,
    view_tx: Arc<watch::Sender<SearchView>>,
) {
    // The view already shows the mount query as loading
    tokio::spawn(run_search(
        session_id,
        MOUNT_REQUEST,
        String::new(),
        provider.clone(),
        recorder.clone(),
        view_tx.clone(),
    ));

    let mut next_request = MOUNT_REQUEST;
    let mut last_issued = Some(String::new());

    while let Some(query) = input.next().await {
        if last_issued.as_deref() == Some(query.as_str()) {
            continue;
        }
        last_issued = Some(query.clone());

        next_request += 1;
        let request_id = next_request;

        apply(
            &view_tx,
            ViewEvent::QueryIssued {
                request_id,
                query: query.clone(),
            },
        );

        tokio::spawn(run_search(
            session_id,
            request_id,
            query,
            provider.clone(),
            recorder.clone(),
            view_tx.clone(),
        ));
    }
}

async fn run_search(
    session_id: Uuid,
    request_id: RequestId,
    query: String,
    provider: Arc<dyn DramaProvider>,
    recorder: TrendingRecorder,
    view_tx: Arc<watch::Sender<SearchView>>,
) {
    let event = match provider.fetch_dramas(&query).await {
        Ok(dramas) => {
            if let Some(top) = dramas.first() {
                recorder.record_in_background(&query, top);
            }
            ViewEvent::ResultsLoaded { request_id, dramas }
        }
        Err(e) => {
            tracing::error!(
                session_id = %session_id,
                request_id,
                query = %query,
                provider = provider.name(),
                error = %e,
                "Session search failed"
            );
            ViewEvent::SearchFailed { request_id }
        }
    };

    apply(&view_tx, event);
}

fn apply(view_tx: &watch::Sender<SearchView>, event: ViewEvent) {
    view_tx.send_modify(|view| {
        let next = view.reduce(event);
        *view = next;
    });
}
