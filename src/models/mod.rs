pub mod drama;
pub mod trending;

pub use drama::{filter_korean, Drama, KOREAN_LANGUAGE};
pub use trending::{NewTrendingRecord, TrendingRecord};
