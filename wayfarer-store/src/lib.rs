pub mod app_config;
pub mod database;
pub mod memory;
pub mod redis_repo;
pub mod sql;

pub use app_config::Config;
pub use database::{DbClient, PgDocumentStore};
pub use memory::MemoryDocumentStore;
pub use redis_repo::RedisClient;
