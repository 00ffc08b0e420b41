use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    db::TrendingStore,
    error::{AppError, AppResult},
    models::{NewTrendingRecord, TrendingRecord},
};

/// Process-local trending store, keyed by search term
///
/// Counts vanish with the process. Used for local development and tests.
#[derive(Default)]
pub struct MemoryTrendingStore {
    records: RwLock<HashMap<String, TrendingRecord>>,
}

impl MemoryTrendingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl TrendingStore for MemoryTrendingStore {
    async fn find_by_term(&self, search_term: &str) -> AppResult<Option<TrendingRecord>> {
        let records = self.records.read().await;
        Ok(records.get(search_term).cloned())
    }

    async fn create(&self, record: NewTrendingRecord) -> AppResult<TrendingRecord> {
        let mut records = self.records.write().await;

        if records.contains_key(&record.search_term) {
            return Err(AppError::Store(format!(
                "Trending record for '{}' already exists",
                record.search_term
            )));
        }

        let created = TrendingRecord {
            id: Uuid::new_v4().simple().to_string(),
            search_term: record.search_term.clone(),
            count: 1,
            poster_url: record.poster_url,
            name: record.name,
            drama_id: record.drama_id,
            updated_at: Some(Utc::now()),
        };
        records.insert(record.search_term, created.clone());

        Ok(created)
    }

    async fn increment(&self, record: &TrendingRecord) -> AppResult<TrendingRecord> {
        let mut records = self.records.write().await;

        let stored = records.get_mut(&record.search_term).ok_or_else(|| {
            AppError::Store(format!(
                "Trending record for '{}' not found",
                record.search_term
            ))
        })?;
        stored.count += 1;
        stored.updated_at = Some(Utc::now());

        Ok(stored.clone())
    }

    async fn list_top(&self, limit: usize) -> AppResult<Vec<TrendingRecord>> {
        let records = self.records.read().await;

        let mut top: Vec<TrendingRecord> = records.values().cloned().collect();
        // Ties fall back to the term so the order is stable
        top.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.search_term.cmp(&b.search_term))
        });
        top.truncate(limit);

        Ok(top)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_record(term: &str) -> NewTrendingRecord {
        NewTrendingRecord {
            search_term: term.to_string(),
            poster_url: None,
            name: format!("{} drama", term),
            drama_id: 1,
        }
    }

    #[tokio::test]
    async fn test_create_then_find() {
        let store = MemoryTrendingStore::new();
        assert!(store.find_by_term("squid").await.unwrap().is_none());

        let created = store.create(new_record("squid")).await.unwrap();
        assert_eq!(created.count, 1);

        let found = store.find_by_term("squid").await.unwrap().unwrap();
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn test_terms_are_exact() {
        let store = MemoryTrendingStore::new();
        store.create(new_record("Squid")).await.unwrap();

        assert!(store.find_by_term("squid").await.unwrap().is_none());
        assert!(store.find_by_term("Squid ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_create_fails() {
        let store = MemoryTrendingStore::new();
        store.create(new_record("squid")).await.unwrap();

        let result = store.create(new_record("squid")).await;
        assert!(matches!(result, Err(AppError::Store(_))));
    }

    #[tokio::test]
    async fn test_increment_unknown_fails() {
        let store = MemoryTrendingStore::new();
        let ghost = store.create(new_record("ghost")).await.unwrap();
        let other = MemoryTrendingStore::new();

        assert!(other.increment(&ghost).await.unwrap_err().is_store());
    }

    #[tokio::test]
    async fn test_list_top_orders_by_count() {
        let store = MemoryTrendingStore::new();
        for term in ["a", "b", "c"] {
            store.create(new_record(term)).await.unwrap();
        }
        let b = store.find_by_term("b").await.unwrap().unwrap();
        let b = store.increment(&b).await.unwrap();
        store.increment(&b).await.unwrap();
        let c = store.find_by_term("c").await.unwrap().unwrap();
        store.increment(&c).await.unwrap();

        let top = store.list_top(2).await.unwrap();
        let terms: Vec<&str> = top.iter().map(|r| r.search_term.as_str()).collect();
        assert_eq!(terms, vec!["b", "c"]);
        assert_eq!(top[0].count, 3);
    }
}
