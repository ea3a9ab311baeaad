pub mod cache;
pub mod page;
pub mod service;

pub use cache::{CacheEntry, RankingCache, TtlPolicy};
pub use page::{PageRequest, MAX_RANKED};
pub use service::{OneResult, RankedList, RecommendationService, ServiceOptions, TopPage};
