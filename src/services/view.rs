//! Search view state and its reducer.
//!
//! The view is an immutable value; every transition goes through
//! [`SearchView::reduce`]. Results are applied only when they answer the most
//! recently issued request, so a slow response for an old query can never
//! overwrite a newer one.

use serde::Serialize;

use crate::error::SEARCH_ERROR_MESSAGE;
use crate::models::Drama;

pub const NO_RESULTS_MESSAGE: &str = "No dramas found.";

/// Monotonic id assigned to each issued search
pub type RequestId = u64;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SearchStatus {
    Idle,
    Loading,
    Failed { message: String },
    Empty { message: String },
    Populated { dramas: Vec<Drama> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchView {
    /// Query of the latest issued request
    pub query: String,
    pub status: SearchStatus,
    /// Id of the latest issued request; 0 before the first one
    pub latest_request: RequestId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    QueryIssued { request_id: RequestId, query: String },
    ResultsLoaded { request_id: RequestId, dramas: Vec<Drama> },
    SearchFailed { request_id: RequestId },
}

impl ViewEvent {
    fn request_id(&self) -> RequestId {
        match self {
            ViewEvent::QueryIssued { request_id, .. }
            | ViewEvent::ResultsLoaded { request_id, .. }
            | ViewEvent::SearchFailed { request_id } => *request_id,
        }
    }
}

impl Default for SearchView {
    fn default() -> Self {
        Self {
            query: String::new(),
            status: SearchStatus::Idle,
            latest_request: 0,
        }
    }
}

impl SearchView {
    pub fn reduce(&self, event: ViewEvent) -> SearchView {
        match event {
            ViewEvent::QueryIssued { request_id, query } => {
                if request_id <= self.latest_request {
                    tracing::debug!(
                        request_id,
                        latest = self.latest_request,
                        "Ignoring out-of-order query"
                    );
                    return self.clone();
                }
                SearchView {
                    query,
                    status: SearchStatus::Loading,
                    latest_request: request_id,
                }
            }
            ref outcome if outcome.request_id() != self.latest_request => {
                tracing::debug!(
                    request_id = outcome.request_id(),
                    latest = self.latest_request,
                    "Discarding stale search outcome"
                );
                self.clone()
            }
            ViewEvent::ResultsLoaded { dramas, .. } => {
                let status = if dramas.is_empty() {
                    SearchStatus::Empty {
                        message: NO_RESULTS_MESSAGE.to_string(),
                    }
                } else {
                    SearchStatus::Populated { dramas }
                };
                SearchView {
                    status,
                    ..self.clone()
                }
            }
            ViewEvent::SearchFailed { .. } => SearchView {
                status: SearchStatus::Failed {
                    message: SEARCH_ERROR_MESSAGE.to_string(),
                },
                ..self.clone()
            },
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == SearchStatus::Loading
    }

    pub fn dramas(&self) -> &[Drama] {
        match &self.status {
            SearchStatus::Populated { dramas } => dramas.as_slice(),
            _ => &[],
        }
    }
}
