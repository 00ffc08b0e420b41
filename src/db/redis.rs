use std::collections::HashMap;
use std::fmt::Display;

use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Client};
use uuid::Uuid;

use crate::{
    db::TrendingStore,
    error::{AppError, AppResult},
    models::{NewTrendingRecord, TrendingRecord},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrendingKey {
    /// Hash holding one record's fields
    Term(String),
    /// Sorted set of terms scored by count
    Ranking,
}

impl Display for TrendingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendingKey::Term(term) => write!(f, "trending:term:{}", term),
            TrendingKey::Ranking => write!(f, "trending:ranking"),
        }
    }
}

/// Creates a Redis client for the trending store
///
/// Connections are multiplexed per call via the tokio-comp feature.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Trending store backed by Redis
///
/// Each term is a hash; the ranking set mirrors the counts so `list_top` is a
/// single range query. Every write touches both inside one transaction, so the
/// hash count and the ranking score never drift apart.
#[derive(Clone)]
pub struct RedisTrendingStore {
    redis_client: Client,
}

impl RedisTrendingStore {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }

    /// Writes a new hash and its ranking entry in one MULTI/EXEC
    fn create_pipeline(record: &TrendingRecord) -> redis::Pipeline {
        let key = TrendingKey::Term(record.search_term.clone()).to_string();
        let updated_at = record.updated_at.unwrap_or_else(Utc::now).to_rfc3339();
        let fields = [
            ("id", record.id.clone()),
            ("search_term", record.search_term.clone()),
            ("count", record.count.to_string()),
            ("poster_url", record.poster_url.clone().unwrap_or_default()),
            ("name", record.name.clone()),
            ("drama_id", record.drama_id.to_string()),
            ("updated_at", updated_at),
        ];

        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset_multiple(&key, &fields)
            .ignore()
            .zadd(TrendingKey::Ranking.to_string(), &record.search_term, record.count)
            .ignore();
        pipe
    }

    /// Bumps the hash count and the ranking score together; yields the new count
    fn increment_pipeline(search_term: &str, now: DateTime<Utc>) -> redis::Pipeline {
        let key = TrendingKey::Term(search_term.to_string()).to_string();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .hincr(&key, "count", 1)
            .hset(&key, "updated_at", now.to_rfc3339())
            .ignore()
            .zincr(TrendingKey::Ranking.to_string(), search_term, 1)
            .ignore();
        pipe
    }

    fn parse_record(fields: HashMap<String, String>) -> AppResult<Option<TrendingRecord>> {
        if fields.is_empty() {
            return Ok(None);
        }

        let field = |name: &str| {
            fields
                .get(name)
                .cloned()
                .ok_or_else(|| AppError::Store(format!("Trending hash missing '{}'", name)))
        };

        let count = field("count")?
            .parse::<u32>()
            .map_err(|e| AppError::Store(format!("Invalid trending count: {}", e)))?;
        let drama_id = field("drama_id")?
            .parse::<u64>()
            .map_err(|e| AppError::Store(format!("Invalid trending drama id: {}", e)))?;
        let updated_at = fields
            .get("updated_at")
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc));

        Ok(Some(TrendingRecord {
            id: field("id")?,
            search_term: field("search_term")?,
            count,
            poster_url: fields.get("poster_url").filter(|url| !url.is_empty()).cloned(),
            name: field("name")?,
            drama_id,
            updated_at,
        }))
    }
}

#[async_trait::async_trait]
impl TrendingStore for RedisTrendingStore {
    async fn find_by_term(&self, search_term: &str) -> AppResult<Option<TrendingRecord>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let key = TrendingKey::Term(search_term.to_string());
        let fields: HashMap<String, String> = conn.hgetall(key.to_string()).await?;

        Self::parse_record(fields)
    }

    async fn create(&self, record: NewTrendingRecord) -> AppResult<TrendingRecord> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let now = Utc::now();

        let created = TrendingRecord {
            id: Uuid::new_v4().simple().to_string(),
            search_term: record.search_term,
            count: 1,
            poster_url: record.poster_url,
            name: record.name,
            drama_id: record.drama_id,
            updated_at: Some(now),
        };

        let _: () = Self::create_pipeline(&created)
            .query_async(&mut conn)
            .await?;

        tracing::debug!(search_term = %created.search_term, "Created trending hash");

        Ok(created)
    }

    async fn increment(&self, record: &TrendingRecord) -> AppResult<TrendingRecord> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let now = Utc::now();

        let (count,): (i64,) = Self::increment_pipeline(&record.search_term, now)
            .query_async(&mut conn)
            .await?;

        let count = u32::try_from(count)
            .map_err(|_| AppError::Store(format!("Trending count out of range: {}", count)))?;

        Ok(TrendingRecord {
            count,
            updated_at: Some(now),
            ..record.clone()
        })
    }

    async fn list_top(&self, limit: usize) -> AppResult<Vec<TrendingRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let terms: Vec<String> = conn
            .zrevrange(TrendingKey::Ranking.to_string(), 0, limit as isize - 1)
            .await?;

        let mut records = Vec::with_capacity(terms.len());
        for term in terms {
            let fields: HashMap<String, String> =
                conn.hgetall(TrendingKey::Term(term).to_string()).await?;
            if let Some(record) = Self::parse_record(fields)? {
                records.push(record);
            }
        }

        Ok(records)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Position of each command name in the packed pipeline, in order
    fn command_positions(pipe: &redis::Pipeline, names: &[&str]) -> Vec<usize> {
        let packed = String::from_utf8_lossy(&pipe.get_packed_pipeline()).into_owned();
        names
            .iter()
            .map(|name| {
                packed
                    .find(&format!("\r\n{}\r\n", name))
                    .unwrap_or_else(|| panic!("{} missing from pipeline", name))
            })
            .collect()
    }

    #[test]
    fn test_increment_runs_in_one_transaction() {
        let pipe = RedisTrendingStore::increment_pipeline("squid", Utc::now());
        let positions =
            command_positions(&pipe, &["MULTI", "HINCRBY", "HSET", "ZINCRBY", "EXEC"]);

        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_create_runs_in_one_transaction() {
        let record = TrendingRecord {
            id: "abc".to_string(),
            search_term: "squid".to_string(),
            count: 1,
            poster_url: None,
            name: "Squid Game".to_string(),
            drama_id: 93405,
            updated_at: None,
        };
        let pipe = RedisTrendingStore::create_pipeline(&record);
        let positions = command_positions(&pipe, &["MULTI", "HMSET", "ZADD", "EXEC"]);

        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_trending_key_display() {
        let key = TrendingKey::Term("Squid Game".to_string());
        assert_eq!(format!("{}", key), "trending:term:Squid Game");
        assert_eq!(format!("{}", TrendingKey::Ranking), "trending:ranking");
    }

    #[test]
    fn test_parse_record_empty_hash() {
        assert_eq!(RedisTrendingStore::parse_record(HashMap::new()).unwrap(), None);
    }

    #[test]
    fn test_parse_record_full_hash() {
        let record = RedisTrendingStore::parse_record(fields(&[
            ("id", "abc"),
            ("search_term", "squid"),
            ("count", "4"),
            ("poster_url", ""),
            ("name", "Squid Game"),
            ("drama_id", "93405"),
            ("updated_at", "2026-10-19T12:00:00+00:00"),
        ]))
        .unwrap()
        .unwrap();

        assert_eq!(record.count, 4);
        assert_eq!(record.drama_id, 93405);
        assert_eq!(record.poster_url, None);
        assert!(record.updated_at.is_some());
    }

    #[test]
    fn test_parse_record_bad_count() {
        let result = RedisTrendingStore::parse_record(fields(&[
            ("id", "abc"),
            ("search_term", "squid"),
            ("count", "many"),
            ("name", "Squid Game"),
            ("drama_id", "1"),
        ]));
        assert!(matches!(result, Err(AppError::Store(_))));
    }

    #[tokio::test]
    async fn test_round_trip_against_local_redis() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let client = create_redis_client(&redis_url).unwrap();
        if client.get_multiplexed_async_connection().await.is_err() {
            // No local Redis available
            return;
        }
        let store = RedisTrendingStore::new(client.clone());
        let term = format!("test_trending_{}", Uuid::new_v4().simple());

        let created = store
            .create(NewTrendingRecord {
                search_term: term.clone(),
                poster_url: Some("https://image.tmdb.org/t/p/w500/x.jpg".to_string()),
                name: "Test Drama".to_string(),
                drama_id: 7,
            })
            .await
            .unwrap();
        let bumped = store.increment(&created).await.unwrap();
        assert_eq!(bumped.count, 2);

        let found = store.find_by_term(&term).await.unwrap().unwrap();
        assert_eq!(found.count, 2);

        // Clean up
        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(TrendingKey::Term(term.clone()).to_string()).await.unwrap();
        let _: () = conn
            .zrem(TrendingKey::Ranking.to_string(), &term)
            .await
            .unwrap();
    }
}
