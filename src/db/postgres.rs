use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::{
    db::TrendingStore,
    error::{AppError, AppResult},
    models::{NewTrendingRecord, TrendingRecord},
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded migrations under `migrations/`
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Row shape of `trending_searches`
///
/// Postgres has no unsigned integers, so `count` and `drama_id` are signed here
/// and checked on the way out.
#[derive(Debug, sqlx::FromRow)]
struct TrendingRow {
    id: String,
    search_term: String,
    count: i32,
    poster_url: Option<String>,
    name: String,
    drama_id: i64,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TrendingRow> for TrendingRecord {
    type Error = AppError;

    fn try_from(row: TrendingRow) -> Result<Self, Self::Error> {
        Ok(TrendingRecord {
            id: row.id,
            search_term: row.search_term,
            count: u32::try_from(row.count)
                .map_err(|_| AppError::Store(format!("Negative trending count: {}", row.count)))?,
            poster_url: row.poster_url,
            name: row.name,
            drama_id: u64::try_from(row.drama_id)
                .map_err(|_| AppError::Store(format!("Negative drama id: {}", row.drama_id)))?,
            updated_at: Some(row.updated_at),
        })
    }
}

/// Trending store backed by the `trending_searches` table
///
/// `search_term` is unique, so a racing second `create` fails with a
/// constraint error instead of adding a duplicate row. Increments happen in a
/// single `UPDATE ... RETURNING` and cannot lose hits.
#[derive(Clone)]
pub struct PgTrendingStore {
    pool: PgPool,
}

impl PgTrendingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TrendingStore for PgTrendingStore {
    async fn find_by_term(&self, search_term: &str) -> AppResult<Option<TrendingRecord>> {
        let row = sqlx::query_as::<_, TrendingRow>(
            r#"
            SELECT id, search_term, count, poster_url, name, drama_id, updated_at
            FROM trending_searches
            WHERE search_term = $1
            "#,
        )
        .bind(search_term)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TrendingRecord::try_from).transpose()
    }

    async fn create(&self, record: NewTrendingRecord) -> AppResult<TrendingRecord> {
        let drama_id = i64::try_from(record.drama_id).map_err(|_| {
            AppError::InvalidInput(format!("Drama id too large: {}", record.drama_id))
        })?;

        let row = sqlx::query_as::<_, TrendingRow>(
            r#"
            INSERT INTO trending_searches (id, search_term, count, poster_url, name, drama_id)
            VALUES ($1, $2, 1, $3, $4, $5)
            RETURNING id, search_term, count, poster_url, name, drama_id, updated_at
            "#,
        )
        .bind(Uuid::new_v4().simple().to_string())
        .bind(&record.search_term)
        .bind(&record.poster_url)
        .bind(&record.name)
        .bind(drama_id)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn increment(&self, record: &TrendingRecord) -> AppResult<TrendingRecord> {
        let row = sqlx::query_as::<_, TrendingRow>(
            r#"
            UPDATE trending_searches
            SET count = count + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING id, search_term, count, poster_url, name, drama_id, updated_at
            "#,
        )
        .bind(&record.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::Store(format!(
                "Trending record for '{}' not found",
                record.search_term
            ))
        })?;

        row.try_into()
    }

    async fn list_top(&self, limit: usize) -> AppResult<Vec<TrendingRecord>> {
        let rows = sqlx::query_as::<_, TrendingRow>(
            r#"
            SELECT id, search_term, count, poster_url, name, drama_id, updated_at
            FROM trending_searches
            ORDER BY count DESC, search_term ASC
            LIMIT $1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TrendingRecord::try_from).collect()
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(count: i32, drama_id: i64) -> TrendingRow {
        TrendingRow {
            id: "abc".to_string(),
            search_term: "squid".to_string(),
            count,
            poster_url: None,
            name: "Squid Game".to_string(),
            drama_id,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_conversion() {
        let record = TrendingRecord::try_from(row(3, 93405)).unwrap();
        assert_eq!(record.count, 3);
        assert_eq!(record.drama_id, 93405);
        assert!(record.updated_at.is_some());
    }

    #[test]
    fn test_row_conversion_rejects_negative() {
        assert!(TrendingRecord::try_from(row(-1, 1)).is_err());
        assert!(TrendingRecord::try_from(row(1, -1)).is_err());
    }
}
