//! Backend contract for the distributed cache
//!
//! A `DistributedCache` is one connected handle over a set of cache servers.
//! A `CacheConnector` builds such handles; calling it again is how server
//! addresses get re-resolved after a failure.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::CacheError;

/// A key/value pair stored in the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheItem {
    pub key: String,
    pub value: String,
}

impl CacheItem {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Raw cache handle without retry or reconnect behaviour
#[async_trait]
pub trait DistributedCache: Send + Sync {
    /// Fetch one value; `CacheError::Miss` when absent
    async fn get(&self, key: &str) -> Result<String, CacheError>;

    /// Fetch several values; absent keys are left out of the map
    async fn get_multi(&self, keys: &[String]) -> Result<HashMap<String, String>, CacheError>;

    /// Unconditional write
    async fn set(&self, item: &CacheItem) -> Result<(), CacheError>;

    /// Write only if absent; `CacheError::NotStored` when the key exists
    async fn add(&self, item: &CacheItem) -> Result<(), CacheError>;

    /// Write only if present; `CacheError::NotStored` when the key is absent
    async fn replace(&self, item: &CacheItem) -> Result<(), CacheError>;

    /// Remove a key; `CacheError::Miss` when absent
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Release connections held by this handle
    async fn close(&self) -> Result<(), CacheError>;
}

/// Builds cache handles from server addresses
#[async_trait]
pub trait CacheConnector: Send + Sync {
    /// Resolve every address and build a fresh handle over them
    async fn connect(&self, servers: &[String]) -> Result<Arc<dyn DistributedCache>, CacheError>;
}
