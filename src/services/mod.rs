// Service exports
pub mod cache;
pub mod matching;
pub mod memory;
pub mod postgres;
pub mod store;

pub use cache::{CacheError, CacheKey, CacheManager};
pub use matching::{MatchingError, MatchingService, RequestDefaults};
pub use memory::MemoryStore;
pub use postgres::PostgresClient;
pub use store::{MatchStore, PairOutcome, PoolQuery, StoreError};
