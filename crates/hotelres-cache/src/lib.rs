//! Distributed cache layer for the hotel inventory service
//!
//! Holds hotel capacities and per-night booked counts in a shared key/value
//! cache. The `ResilientCache` client wraps a raw backend with bounded
//! retries, connection resets and a validation probe.
//!
//! # Features
//!
//! - Redis backend with one `ConnectionManager` per server and hash sharding
//! - In-process backend for tests and single-node runs
//! - Immediate reconnect on the first retry, fixed delay afterwards
//! - Process-wide cap on concurrent connection resets
//!
//! # Example
//!
//! ```no_run
//! use hotelres_cache::{RedisConnector, ResetLimiter, ResilientCache};
//! use hotelres_core::config::{CacheConfig, RetryConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let retry = RetryConfig::default();
//!     let cache = ResilientCache::connect(
//!         Arc::new(RedisConnector::new()),
//!         &CacheConfig::default(),
//!         &retry,
//!         ResetLimiter::from_config(&retry),
//!     )
//!     .await?;
//!
//!     let capacity = cache.get("42_cap").await?;
//!     println!("{:?}", capacity);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod keys;
pub mod limiter;
pub mod memory;
pub mod redis_backend;
pub mod resilient;

pub use backend::{CacheConnector, CacheItem, DistributedCache};
pub use error::CacheError;
pub use limiter::ResetLimiter;
pub use memory::MemoryConnector;
pub use redis_backend::{RedisBackend, RedisConnector};
pub use resilient::{ResetOutcome, ResilientCache};
