//! Redis-backed distributed cache
//!
//! One `ConnectionManager` is kept per configured server. Keys are placed on a
//! server by an FNV-1a hash of the key, so every process sharing the same
//! server list agrees on placement.

use async_trait::async_trait;
use futures::future::try_join_all;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::backend::{CacheConnector, CacheItem, DistributedCache};
use crate::error::CacheError;

/// Builds `RedisBackend` handles, resolving every address on each call
#[derive(Debug, Default, Clone)]
pub struct RedisConnector;

impl RedisConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheConnector for RedisConnector {
    async fn connect(&self, servers: &[String]) -> Result<Arc<dyn DistributedCache>, CacheError> {
        let backend = RedisBackend::connect(servers).await?;
        Ok(Arc::new(backend))
    }
}

/// Sharded Redis client
#[derive(Clone)]
pub struct RedisBackend {
    shards: Vec<ConnectionManager>,
}

impl RedisBackend {
    /// Connect to every server in `servers`
    ///
    /// Addresses without a scheme are treated as `redis://host:port`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Connection` if the list is empty or any server
    /// cannot be reached
    pub async fn connect(servers: &[String]) -> Result<Self, CacheError> {
        if servers.is_empty() {
            return Err(CacheError::Connection("no cache servers configured".into()));
        }

        let mut shards = Vec::with_capacity(servers.len());
        for server in servers {
            let url = normalize_url(server);
            debug!("Connecting to Redis at {}", url);

            let client = Client::open(url.as_str()).map_err(|e| {
                error!("Failed to create Redis client for {}: {}", url, e);
                CacheError::Connection(format!("Invalid Redis URL {}: {}", url, e))
            })?;

            let manager = ConnectionManager::new(client).await.map_err(|e| {
                error!("Failed to establish Redis connection to {}: {}", url, e);
                CacheError::Connection(format!("Connection to {} failed: {}", url, e))
            })?;

            shards.push(manager);
        }

        debug!(servers = shards.len(), "Redis connections established");
        Ok(Self { shards })
    }

    fn shard_index(&self, key: &str) -> usize {
        (fnv1a(key.as_bytes()) % self.shards.len() as u64) as usize
    }

    fn shard(&self, key: &str) -> ConnectionManager {
        self.shards[self.shard_index(key)].clone()
    }

    /// Convert RedisError to CacheError
    fn map_redis_error(err: RedisError) -> CacheError {
        if err.kind() == redis::ErrorKind::IoError
            || err.is_connection_dropped()
            || err.is_connection_refusal()
            || err.is_timeout()
        {
            warn!("Redis connection error: {}", err);
            CacheError::Connection(err.to_string())
        } else {
            error!("Redis error: {}", err);
            CacheError::Backend(err.to_string())
        }
    }

    async fn set_conditional(&self, item: &CacheItem, condition: &str) -> Result<(), CacheError> {
        let mut conn = self.shard(&item.key);
        let reply: Option<String> = redis::cmd("SET")
            .arg(&item.key)
            .arg(&item.value)
            .arg(condition)
            .query_async(&mut conn)
            .await
            .map_err(Self::map_redis_error)?;

        match reply {
            Some(_) => Ok(()),
            None => Err(CacheError::NotStored),
        }
    }
}

#[async_trait]
impl DistributedCache for RedisBackend {
    async fn get(&self, key: &str) -> Result<String, CacheError> {
        debug!("GET {}", key);
        let mut conn = self.shard(key);

        let result: Option<String> = conn.get(key).await.map_err(Self::map_redis_error)?;
        result.ok_or(CacheError::Miss)
    }

    async fn get_multi(&self, keys: &[String]) -> Result<HashMap<String, String>, CacheError> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let mut groups: HashMap<usize, Vec<&String>> = HashMap::new();
        for key in keys {
            groups.entry(self.shard_index(key)).or_default().push(key);
        }

        let lookups = groups.into_iter().map(|(index, group)| {
            let mut conn = self.shards[index].clone();
            async move {
                debug!(shard = index, keys = group.len(), "MGET");
                let values: Vec<Option<String>> = redis::cmd("MGET")
                    .arg(&group)
                    .query_async(&mut conn)
                    .await
                    .map_err(Self::map_redis_error)?;
                Ok::<_, CacheError>(
                    group
                        .into_iter()
                        .zip(values)
                        .filter_map(|(key, value)| value.map(|v| (key.clone(), v)))
                        .collect::<Vec<_>>(),
                )
            }
        });

        let found = try_join_all(lookups).await?;
        Ok(found.into_iter().flatten().collect())
    }

    async fn set(&self, item: &CacheItem) -> Result<(), CacheError> {
        debug!("SET {}", item.key);
        let mut conn = self.shard(&item.key);

        let _: () = conn
            .set(&item.key, &item.value)
            .await
            .map_err(Self::map_redis_error)?;
        Ok(())
    }

    async fn add(&self, item: &CacheItem) -> Result<(), CacheError> {
        debug!("SET NX {}", item.key);
        self.set_conditional(item, "NX").await
    }

    async fn replace(&self, item: &CacheItem) -> Result<(), CacheError> {
        debug!("SET XX {}", item.key);
        self.set_conditional(item, "XX").await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        debug!("DEL {}", key);
        let mut conn = self.shard(key);

        let deleted: i64 = conn.del(key).await.map_err(Self::map_redis_error)?;
        if deleted > 0 {
            Ok(())
        } else {
            Err(CacheError::Miss)
        }
    }

    async fn close(&self) -> Result<(), CacheError> {
        // Managers close their sockets when the last clone is dropped.
        Ok(())
    }
}

fn normalize_url(server: &str) -> String {
    if server.contains("://") {
        server.to_string()
    } else {
        format!("redis://{}", server)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;

    bytes.iter().fold(OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("10.0.0.5:6379"), "redis://10.0.0.5:6379");
        assert_eq!(normalize_url("redis://cache:6379/0"), "redis://cache:6379/0");
    }

    #[test]
    fn test_fnv1a_reference_values() {
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }

    async fn setup_backend() -> RedisBackend {
        RedisBackend::connect(&["127.0.0.1:6379".to_string()])
            .await
            .expect("Failed to connect to Redis")
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_set_get_delete() {
        let backend = setup_backend().await;
        let item = CacheItem::new("hotelres_test_rt", "12");

        backend.set(&item).await.unwrap();
        assert_eq!(backend.get("hotelres_test_rt").await.unwrap(), "12");

        backend.delete("hotelres_test_rt").await.unwrap();
        assert_eq!(
            backend.get("hotelres_test_rt").await,
            Err(CacheError::Miss)
        );
        assert_eq!(
            backend.delete("hotelres_test_rt").await,
            Err(CacheError::Miss)
        );
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_add_and_replace_conditions() {
        let backend = setup_backend().await;
        let _ = backend.delete("hotelres_test_cond").await;

        let item = CacheItem::new("hotelres_test_cond", "1");
        assert_eq!(backend.replace(&item).await, Err(CacheError::NotStored));
        backend.add(&item).await.unwrap();
        assert_eq!(backend.add(&item).await, Err(CacheError::NotStored));
        backend
            .replace(&CacheItem::new("hotelres_test_cond", "2"))
            .await
            .unwrap();
        assert_eq!(backend.get("hotelres_test_cond").await.unwrap(), "2");

        backend.delete("hotelres_test_cond").await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_get_multi_partial() {
        let backend = setup_backend().await;
        backend
            .set(&CacheItem::new("hotelres_test_m1", "3"))
            .await
            .unwrap();
        let _ = backend.delete("hotelres_test_m2").await;

        let found = backend
            .get_multi(&["hotelres_test_m1".to_string(), "hotelres_test_m2".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found.get("hotelres_test_m1").map(String::as_str), Some("3"));

        backend.delete("hotelres_test_m1").await.unwrap();
    }
}
