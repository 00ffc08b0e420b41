use serde::{Deserialize, Serialize};

/// Language tag of the dramas this service surfaces
pub const KOREAN_LANGUAGE: &str = "ko";

/// A TV drama as returned by the metadata provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Drama {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub original_name: Option<String>,
    /// ISO 639-1 tag, e.g. "ko"
    #[serde(default)]
    pub original_language: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    /// "YYYY-MM-DD", may be empty for unaired shows
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f32>,
}

impl Drama {
    pub fn is_korean(&self) -> bool {
        self.original_language == KOREAN_LANGUAGE
    }

    /// Full poster URL under the given image base, if the drama has a poster
    pub fn poster_url(&self, image_base_url: &str) -> Option<String> {
        self.poster_path
            .as_deref()
            .filter(|path| !path.is_empty())
            .map(|path| format!("{}{}", image_base_url.trim_end_matches('/'), path))
    }

    pub fn first_air_year(&self) -> Option<i32> {
        self.first_air_date
            .as_deref()
            .and_then(|date| date.split('-').next())
            .and_then(|year| year.parse().ok())
    }
}

/// Keeps only Korean-language dramas, preserving provider order
pub fn filter_korean(dramas: Vec<Drama>) -> Vec<Drama> {
    dramas.into_iter().filter(Drama::is_korean).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drama(id: u64, name: &str, language: &str) -> Drama {
        Drama {
            id,
            name: name.to_string(),
            original_name: None,
            original_language: language.to_string(),
            poster_path: Some(format!("/{}.jpg", id)),
            overview: None,
            first_air_date: Some("2021-09-17".to_string()),
            vote_average: Some(7.8),
        }
    }

    #[test]
    fn test_filter_korean_preserves_order() {
        let dramas = vec![
            drama(1, "Squid Game", "ko"),
            drama(2, "Alice in Borderland", "ja"),
            drama(3, "Hellbound", "ko"),
            drama(4, "Money Heist", "es"),
            drama(5, "Kingdom", "ko"),
        ];

        let filtered = filter_korean(dramas);
        let ids: Vec<u64> = filtered.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }

    #[test]
    fn test_filter_korean_is_case_sensitive() {
        let filtered = filter_korean(vec![drama(1, "Upper", "KO"), drama(2, "Lower", "ko")]);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, 2);
    }

    #[test]
    fn test_poster_url_joins_base() {
        let d = drama(93405, "Squid Game", "ko");
        assert_eq!(
            d.poster_url("https://image.tmdb.org/t/p/w500/"),
            Some("https://image.tmdb.org/t/p/w500/93405.jpg".to_string())
        );
    }

    #[test]
    fn test_poster_url_missing() {
        let mut d = drama(1, "No Poster", "ko");
        d.poster_path = None;
        assert_eq!(d.poster_url("https://image.tmdb.org/t/p/w500"), None);

        d.poster_path = Some(String::new());
        assert_eq!(d.poster_url("https://image.tmdb.org/t/p/w500"), None);
    }

    #[test]
    fn test_first_air_year() {
        let mut d = drama(1, "Squid Game", "ko");
        assert_eq!(d.first_air_year(), Some(2021));

        d.first_air_date = Some(String::new());
        assert_eq!(d.first_air_year(), None);
    }

    #[test]
    fn test_deserialize_tmdb_tv_result() {
        let json = r#"{
            "id": 93405,
            "name": "Squid Game",
            "original_name": "오징어 게임",
            "original_language": "ko",
            "poster_path": "/dDlEmu3EZ0Pgg93K2SVNLCjCSvE.jpg",
            "first_air_date": "2021-09-17",
            "vote_average": 7.8,
            "genre_ids": [10759, 9648, 18]
        }"#;

        let d: Drama = serde_json::from_str(json).unwrap();
        assert_eq!(d.id, 93405);
        assert_eq!(d.original_name.as_deref(), Some("오징어 게임"));
        assert!(d.is_korean());
        assert_eq!(d.overview, None);
    }
}
