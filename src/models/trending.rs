use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Drama;

/// Persisted hit counter for one search term
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendingRecord {
    /// Store-assigned document id
    pub id: String,
    /// Exact query string, unique per record
    pub search_term: String,
    /// Number of successful searches observed, always >= 1
    pub count: u32,
    pub poster_url: Option<String>,
    /// Display name of the top result at creation time
    pub name: String,
    pub drama_id: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields needed to create a trending record on first hit
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrendingRecord {
    pub search_term: String,
    pub poster_url: Option<String>,
    pub name: String,
    pub drama_id: u64,
}

impl NewTrendingRecord {
    pub fn from_top_result(search_term: &str, top: &Drama, image_base_url: &str) -> Self {
        Self {
            search_term: search_term.to_string(),
            poster_url: top.poster_url(image_base_url),
            name: top.name.clone(),
            drama_id: top.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_from_top_result() {
        let top = Drama {
            id: 93405,
            name: "Squid Game".to_string(),
            original_name: None,
            original_language: "ko".to_string(),
            poster_path: Some("/squid.jpg".to_string()),
            overview: None,
            first_air_date: None,
            vote_average: None,
        };

        let record =
            NewTrendingRecord::from_top_result("squid", &top, "https://image.tmdb.org/t/p/w500");
        assert_eq!(record.search_term, "squid");
        assert_eq!(record.name, "Squid Game");
        assert_eq!(record.drama_id, 93405);
        assert_eq!(
            record.poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/squid.jpg")
        );
    }
}
