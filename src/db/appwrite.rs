/// Appwrite database store for trending searches
///
/// Talks to the Appwrite REST API directly:
/// - list:   GET   /databases/{db}/collections/{col}/documents?queries[]=...
/// - create: POST  /databases/{db}/collections/{col}/documents
/// - update: PATCH /databases/{db}/collections/{col}/documents/{id}
///
/// Increments are read-modify-write; concurrent writers can lose hits.
use chrono::{DateTime, Utc};
use reqwest::{Client as HttpClient, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    db::TrendingStore,
    error::{AppError, AppResult},
    models::{NewTrendingRecord, TrendingRecord},
};

const PROJECT_HEADER: &str = "X-Appwrite-Project";
const KEY_HEADER: &str = "X-Appwrite-Key";

/// Collection attribute names
const ATTR_SEARCH_TERM: &str = "searchTerm";
const ATTR_COUNT: &str = "count";

/// Connection settings for one Appwrite collection
#[derive(Debug, Clone)]
pub struct AppwriteSettings {
    pub endpoint: String,
    pub project_id: String,
    pub database_id: String,
    pub collection_id: String,
    pub api_key: Option<String>,
}

/// Appwrite query strings, JSON-encoded as the REST API expects
pub mod query {
    use serde_json::json;

    pub fn equal(attribute: &str, value: &str) -> String {
        json!({ "method": "equal", "attribute": attribute, "values": [value] }).to_string()
    }

    pub fn order_desc(attribute: &str) -> String {
        json!({ "method": "orderDesc", "attribute": attribute }).to_string()
    }

    pub fn limit(limit: usize) -> String {
        json!({ "method": "limit", "values": [limit] }).to_string()
    }
}

#[derive(Debug, Deserialize)]
struct DocumentList {
    documents: Vec<TrendingDocument>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TrendingDocument {
    #[serde(rename = "$id", default, skip_serializing)]
    id: String,
    #[serde(rename = "searchTerm")]
    search_term: String,
    count: u32,
    #[serde(default)]
    poster_url: Option<String>,
    name: String,
    drama_id: u64,
    #[serde(rename = "$updatedAt", default, skip_serializing)]
    updated_at: Option<DateTime<Utc>>,
}

impl From<TrendingDocument> for TrendingRecord {
    fn from(doc: TrendingDocument) -> Self {
        TrendingRecord {
            id: doc.id,
            search_term: doc.search_term,
            count: doc.count,
            poster_url: doc.poster_url,
            name: doc.name,
            drama_id: doc.drama_id,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct AppwriteTrendingStore {
    http_client: HttpClient,
    settings: AppwriteSettings,
}

impl AppwriteTrendingStore {
    pub fn new(settings: AppwriteSettings) -> Self {
        Self {
            http_client: HttpClient::new(),
            settings,
        }
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.settings.endpoint.trim_end_matches('/'),
            self.settings.database_id,
            self.settings.collection_id
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header(PROJECT_HEADER, &self.settings.project_id);
        match &self.settings.api_key {
            Some(key) => request.header(KEY_HEADER, key),
            None => request,
        }
    }

    async fn list_documents(&self, queries: &[String]) -> AppResult<Vec<TrendingRecord>> {
        let params: Vec<(&str, &str)> = queries
            .iter()
            .map(|q| ("queries[]", q.as_str()))
            .collect();

        let response = self
            .authorize(self.http_client.get(self.documents_url()))
            .query(&params)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let list: DocumentList = Self::checked(response).await?.json().await.map_err(|e| {
            AppError::Store(format!("Failed to parse Appwrite document list: {}", e))
        })?;

        Ok(list.documents.into_iter().map(TrendingRecord::from).collect())
    }

    async fn checked(response: Response) -> AppResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::Store(format!(
            "Appwrite returned status {}: {}",
            status, body
        )))
    }

    /// Transport failures here are store failures, not search failures
    fn transport_error(e: reqwest::Error) -> AppError {
        AppError::Store(format!("Appwrite request failed: {}", e))
    }
}

#[async_trait::async_trait]
impl TrendingStore for AppwriteTrendingStore {
    async fn find_by_term(&self, search_term: &str) -> AppResult<Option<TrendingRecord>> {
        let documents = self
            .list_documents(&[query::equal(ATTR_SEARCH_TERM, search_term), query::limit(1)])
            .await?;

        Ok(documents.into_iter().next())
    }

    async fn create(&self, record: NewTrendingRecord) -> AppResult<TrendingRecord> {
        let document = TrendingDocument {
            id: String::new(),
            search_term: record.search_term,
            count: 1,
            poster_url: record.poster_url,
            name: record.name,
            drama_id: record.drama_id,
            updated_at: None,
        };

        let response = self
            .authorize(self.http_client.post(self.documents_url()))
            .json(&json!({
                "documentId": Uuid::new_v4().simple().to_string(),
                "data": document,
            }))
            .send()
            .await
            .map_err(Self::transport_error)?;

        let created: TrendingDocument = Self::checked(response)
            .await?
            .json()
            .await
            .map_err(|e| {
                AppError::Store(format!("Failed to parse created Appwrite document: {}", e))
            })?;

        tracing::debug!(
            document_id = %created.id,
            search_term = %created.search_term,
            "Created trending document"
        );

        Ok(created.into())
    }

    async fn increment(&self, record: &TrendingRecord) -> AppResult<TrendingRecord> {
        let url = format!("{}/{}", self.documents_url(), record.id);

        let response = self
            .authorize(self.http_client.patch(url))
            .json(&json!({ "data": { ATTR_COUNT: record.count + 1 } }))
            .send()
            .await
            .map_err(Self::transport_error)?;

        let updated: TrendingDocument = Self::checked(response).await?.json().await.map_err(|e| {
            AppError::Store(format!("Failed to parse updated Appwrite document: {}", e))
        })?;

        Ok(updated.into())
    }

    async fn list_top(&self, limit: usize) -> AppResult<Vec<TrendingRecord>> {
        self.list_documents(&[query::limit(limit), query::order_desc(ATTR_COUNT)])
            .await
    }

    fn name(&self) -> &'static str {
        "appwrite"
    }
}
