/// TMDB TV provider
///
/// Two request shapes:
/// 1. Discover: /discover/tv filtered to Korean-language dramas first aired
///    since 2020, most popular first. Used when the query is empty.
/// 2. Search: /search/tv?query=... Free text, no language filter server-side.
///
/// Both are filtered to `original_language == "ko"` after parsing, since the
/// search endpoint cannot filter by language.
use crate::{
    error::{AppError, AppResult},
    models::{filter_korean, Drama, KOREAN_LANGUAGE},
    services::providers::DramaProvider,
};
use reqwest::{header::ACCEPT, Client as HttpClient, Url};
use serde::Deserialize;
use std::time::Duration;

/// TMDB genre id for "Drama"
const DRAMA_GENRE_ID: &str = "18";
const DISCOVER_FIRST_AIR_DATE_GTE: &str = "2020-01-01";
const DISCOVER_SORT: &str = "popularity.desc";

/// Which TMDB endpoint a query maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DramaEndpoint {
    Discover,
    Search(String),
}

impl DramaEndpoint {
    pub fn for_query(query: &str) -> Self {
        if query.trim().is_empty() {
            DramaEndpoint::Discover
        } else {
            DramaEndpoint::Search(query.to_string())
        }
    }

    /// Full request URL with query parameters escaped
    pub fn url(&self, api_url: &str) -> AppResult<Url> {
        let base = api_url.trim_end_matches('/');
        let parsed = match self {
            DramaEndpoint::Discover => Url::parse_with_params(
                &format!("{}/discover/tv", base),
                &[
                    ("with_original_language", KOREAN_LANGUAGE),
                    ("with_genres", DRAMA_GENRE_ID),
                    ("first_air_date.gte", DISCOVER_FIRST_AIR_DATE_GTE),
                    ("sort_by", DISCOVER_SORT),
                ],
            ),
            DramaEndpoint::Search(query) => Url::parse_with_params(
                &format!("{}/search/tv", base),
                &[("query", query.as_str())],
            ),
        };

        // Reported like any other provider failure so clients get the generic message
        parsed.map_err(|e| AppError::Network(format!("Invalid TMDB URL {}: {}", base, e)))
    }

    fn label(&self) -> &'static str {
        match self {
            DramaEndpoint::Discover => "discover",
            DramaEndpoint::Search(_) => "search",
        }
    }
}

/// Paged TMDB response; `results` may be missing on odd responses
#[derive(Debug, Deserialize)]
struct TmdbPage {
    #[serde(default)]
    results: Option<Vec<serde_json::Value>>,
}

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl TmdbProvider {
    pub fn new(api_key: String, api_url: String, timeout: Duration) -> AppResult<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "TMDB API key cannot be empty".to_string(),
            ));
        }

        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url,
        })
    }
}

#[async_trait::async_trait]
impl DramaProvider for TmdbProvider {
    async fn fetch_dramas(&self, query: &str) -> AppResult<Vec<Drama>> {
        let endpoint = DramaEndpoint::for_query(query);
        let url = endpoint.url(&self.api_url)?;

        tracing::debug!(endpoint = endpoint.label(), query = %query, "Fetching dramas");

        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Network(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        let page: TmdbPage = response.json().await?;

        let dramas: Vec<Drama> = match page.results {
            Some(results) => results
                .into_iter()
                .filter_map(|result| serde_json::from_value::<Drama>(result).ok())
                .collect(),
            None => {
                tracing::warn!(
                    endpoint = endpoint.label(),
                    query = %query,
                    "TMDB response had no results array"
                );
                Vec::new()
            }
        };

        let fetched = dramas.len();
        let dramas = filter_korean(dramas);

        tracing::info!(
            endpoint = endpoint.label(),
            query = %query,
            fetched,
            results = dramas.len(),
            provider = "tmdb",
            "Drama fetch completed"
        );

        Ok(dramas)
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const API_URL: &str = "https://api.themoviedb.org/3";

    #[test]
    fn test_empty_query_uses_discover() {
        assert_eq!(DramaEndpoint::for_query(""), DramaEndpoint::Discover);
        assert_eq!(DramaEndpoint::for_query("   "), DramaEndpoint::Discover);
    }

    #[test]
    fn test_text_query_uses_search() {
        assert_eq!(
            DramaEndpoint::for_query("squid"),
            DramaEndpoint::Search("squid".to_string())
        );
    }

    #[test]
    fn test_discover_url() {
        let url = DramaEndpoint::Discover.url(API_URL).unwrap();
        assert_eq!(url.path(), "/3/discover/tv");

        let params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(params.contains(&("with_original_language".into(), "ko".into())));
        assert!(params.contains(&("with_genres".into(), "18".into())));
        assert!(params.contains(&("first_air_date.gte".into(), "2020-01-01".into())));
        assert!(params.contains(&("sort_by".into(), "popularity.desc".into())));
    }

    #[test]
    fn test_malformed_base_url_is_network_error() {
        let err = DramaEndpoint::for_query("squid")
            .url("not a url")
            .unwrap_err();
        assert!(err.is_network());
    }

    #[test]
    fn test_search_url() {
        let url = DramaEndpoint::for_query("squid").url(API_URL).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.themoviedb.org/3/search/tv?query=squid"
        );
    }

    #[test]
    fn test_search_url_escapes_query() {
        let url = DramaEndpoint::for_query("crash landing & you?")
            .url(API_URL)
            .unwrap();
        assert_eq!(url.query(), Some("query=crash+landing+%26+you%3F"));

        let (_, value) = url.query_pairs().next().unwrap();
        assert_eq!(value, "crash landing & you?");
    }

    #[test]
    fn test_url_tolerates_trailing_slash() {
        let url = DramaEndpoint::Discover
            .url("https://api.themoviedb.org/3/")
            .unwrap();
        assert_eq!(url.path(), "/3/discover/tv");
    }

    #[test]
    fn test_new_rejects_blank_key() {
        let result = TmdbProvider::new(
            " ".to_string(),
            API_URL.to_string(),
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_page_without_results() {
        let page: TmdbPage = serde_json::from_str(r#"{"page": 1}"#).unwrap();
        assert!(page.results.is_none());
    }
}
