use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::request_id::RequestId;
use crate::models::{Drama, TrendingRecord};
use crate::services::view::NO_RESULTS_MESSAGE;
use crate::services::{search, top_searches, SearchView};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
}

/// A search hit with its display fields resolved
#[derive(Debug, Serialize)]
pub struct DramaResult {
    #[serde(flatten)]
    pub drama: Drama,
    pub poster_url: Option<String>,
    pub first_air_year: Option<i32>,
}

impl DramaResult {
    fn new(drama: Drama, image_base_url: &str) -> Self {
        Self {
            poster_url: drama.poster_url(image_base_url),
            first_air_year: drama.first_air_year(),
            drama,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<DramaResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A search the client ran itself and wants counted
#[derive(Debug, Deserialize)]
pub struct RecordSearchRequest {
    pub search_term: String,
    pub top_result: Drama,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQueryRequest {
    pub query: String,
}

const DEFAULT_WAIT_MS: u64 = 25_000;
const MAX_WAIT_MS: u64 = 60_000;

fn default_wait_ms() -> u64 {
    DEFAULT_WAIT_MS
}

#[derive(Debug, Deserialize)]
pub struct WaitParams {
    /// Request id the client has already seen settle
    #[serde(default)]
    pub after: u64,
    #[serde(default = "default_wait_ms")]
    pub wait_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub view: SearchView,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Search dramas; an empty query lists popular Korean dramas
pub async fn search_dramas(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<SearchResponse>> {
    tracing::info!(
        request_id = %request_id,
        query = %params.query,
        "Processing drama search"
    );

    let results =
        search::search_dramas(state.provider.as_ref(), &state.recorder, &params.query).await?;

    let message = results
        .is_empty()
        .then(|| NO_RESULTS_MESSAGE.to_string());
    let image_base_url = state.recorder.image_base_url();
    let results = results
        .into_iter()
        .map(|drama| DramaResult::new(drama, image_base_url))
        .collect();

    Ok(Json(SearchResponse {
        query: params.query,
        results,
        message,
    }))
}

/// Most searched terms; empty if the store is unavailable
pub async fn get_trending(State(state): State<AppState>) -> Json<Vec<TrendingRecord>> {
    let records = top_searches(state.store.as_ref(), state.settings.trending_limit).await;
    Json(records)
}

/// Count a search and wait for the store; store failures surface as 503
pub async fn record_search(
    State(state): State<AppState>,
    Json(request): Json<RecordSearchRequest>,
) -> AppResult<StatusCode> {
    if request.search_term.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "search_term must not be empty".to_string(),
        ));
    }

    state
        .recorder
        .record(&request.search_term, &request.top_result)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Start a search session; the view is already loading the discover list
pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionResponse>) {
    let session = state.start_session();
    let view = session.view();
    let id = state.insert_session(session).await;

    tracing::debug!(session_id = %id, "Session created");

    (StatusCode::CREATED, Json(SessionResponse { id, view }))
}

/// Current view of a session
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionResponse>> {
    let view = state.with_session(id, |session| session.view()).await?;
    Ok(Json(SessionResponse { id, view }))
}

/// Long-poll until the session has settled a request at or after `after`
///
/// Answers with whatever the view is once `wait_ms` elapses.
pub async fn wait_for_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<WaitParams>,
) -> AppResult<Json<SessionResponse>> {
    let mut rx = state.with_session(id, |session| session.subscribe()).await?;
    let wait = Duration::from_millis(params.wait_ms.min(MAX_WAIT_MS));
    let after = params.after;

    let settled = tokio::time::timeout(wait, async {
        rx.wait_for(|view| view.latest_request >= after && !view.is_loading())
            .await
            .is_ok()
    })
    .await;

    if !matches!(settled, Ok(true)) {
        tracing::debug!(session_id = %id, after, "Session wait returned unsettled");
    }

    let view = rx.borrow().clone();
    Ok(Json(SessionResponse { id, view }))
}

/// Push raw input into a session
pub async fn update_session_query(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateQueryRequest>,
) -> AppResult<StatusCode> {
    state
        .with_session(id, |session| session.set_query(request.query))
        .await?;
    Ok(StatusCode::ACCEPTED)
}

/// End a session
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if state.remove_session(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {}", id)))
    }
}
