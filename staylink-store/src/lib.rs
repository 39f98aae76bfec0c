pub mod app_config;
pub mod cache;
pub mod redis_repo;
pub mod database;
pub mod inventory_repo;
pub mod booking_repo;

pub use cache::{CacheStore, CacheStoreError, MemoryStore, SharedCache};
pub use database::DbClient;
pub use redis_repo::RedisClient;
pub use inventory_repo::PostgresInventoryRepository;
pub use booking_repo::PostgresBookingRepository;
