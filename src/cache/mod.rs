//! Cache
//!
//! Almacén Redis de códigos OTP efímeros.

pub mod cache_config;
pub mod redis_client;

pub use cache_config::CacheConfig;
pub use redis_client::RedisClient;
