pub mod appwrite;
pub mod memory;
pub mod postgres;
pub mod redis;
pub mod store;

pub use appwrite::{AppwriteSettings, AppwriteTrendingStore};
pub use memory::MemoryTrendingStore;
pub use postgres::{create_pool, run_migrations, PgTrendingStore};
pub use redis::{create_redis_client, RedisTrendingStore};
pub use store::TrendingStore;

#[cfg(test)]
pub use store::MockTrendingStore;
