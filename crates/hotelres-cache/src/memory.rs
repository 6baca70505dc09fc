//! In-process cache backend
//!
//! Used when the configured server list is `memory`, and by tests. Every
//! handle built by one `MemoryConnector` shares the same map, so a reconnect
//! keeps the contents the way a real cache server would.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::backend::{CacheConnector, CacheItem, DistributedCache};
use crate::error::CacheError;

type SharedMap = Arc<Mutex<HashMap<String, String>>>;

#[derive(Debug, Default, Clone)]
pub struct MemoryConnector {
    store: SharedMap,
    connects: Arc<AtomicUsize>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles built so far
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Read a key directly, bypassing any handle
    pub fn peek(&self, key: &str) -> Option<String> {
        self.store.lock().get(key).cloned()
    }

    /// Write a key directly, bypassing any handle
    pub fn seed(&self, key: impl Into<String>, value: impl Into<String>) {
        self.store.lock().insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }
}

#[async_trait]
impl CacheConnector for MemoryConnector {
    async fn connect(&self, _servers: &[String]) -> Result<Arc<dyn DistributedCache>, CacheError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MemoryBackend {
            store: Arc::clone(&self.store),
            closed: AtomicBool::new(false),
        }))
    }
}

/// One handle onto the shared map
#[derive(Debug)]
pub struct MemoryBackend {
    store: SharedMap,
    closed: AtomicBool,
}

impl MemoryBackend {
    fn ensure_open(&self) -> Result<(), CacheError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CacheError::Connection("handle closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DistributedCache for MemoryBackend {
    async fn get(&self, key: &str) -> Result<String, CacheError> {
        self.ensure_open()?;
        self.store.lock().get(key).cloned().ok_or(CacheError::Miss)
    }

    async fn get_multi(&self, keys: &[String]) -> Result<HashMap<String, String>, CacheError> {
        self.ensure_open()?;
        let store = self.store.lock();
        Ok(keys
            .iter()
            .filter_map(|key| store.get(key).map(|v| (key.clone(), v.clone())))
            .collect())
    }

    async fn set(&self, item: &CacheItem) -> Result<(), CacheError> {
        self.ensure_open()?;
        self.store
            .lock()
            .insert(item.key.clone(), item.value.clone());
        Ok(())
    }

    async fn add(&self, item: &CacheItem) -> Result<(), CacheError> {
        self.ensure_open()?;
        let mut store = self.store.lock();
        if store.contains_key(&item.key) {
            return Err(CacheError::NotStored);
        }
        store.insert(item.key.clone(), item.value.clone());
        Ok(())
    }

    async fn replace(&self, item: &CacheItem) -> Result<(), CacheError> {
        self.ensure_open()?;
        let mut store = self.store.lock();
        match store.get_mut(&item.key) {
            Some(value) => {
                *value = item.value.clone();
                Ok(())
            }
            None => Err(CacheError::NotStored),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.ensure_open()?;
        self.store
            .lock()
            .remove(key)
            .map(|_| ())
            .ok_or(CacheError::Miss)
    }

    async fn close(&self) -> Result<(), CacheError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handles_share_contents() {
        let connector = MemoryConnector::new();
        let first = connector.connect(&[]).await.unwrap();
        let second = connector.connect(&[]).await.unwrap();

        first.set(&CacheItem::new("H1_cap", "10")).await.unwrap();
        assert_eq!(second.get("H1_cap").await.unwrap(), "10");
        assert_eq!(connector.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_conditional_writes() {
        let connector = MemoryConnector::new();
        let cache = connector.connect(&[]).await.unwrap();
        let item = CacheItem::new("k", "1");

        assert_eq!(cache.replace(&item).await, Err(CacheError::NotStored));
        cache.add(&item).await.unwrap();
        assert_eq!(cache.add(&item).await, Err(CacheError::NotStored));
        cache.replace(&CacheItem::new("k", "2")).await.unwrap();
        assert_eq!(connector.peek("k").as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_closed_handle_fails() {
        let connector = MemoryConnector::new();
        let cache = connector.connect(&[]).await.unwrap();
        cache.close().await.unwrap();

        assert!(matches!(
            cache.get("k").await,
            Err(CacheError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_absent_is_miss() {
        let connector = MemoryConnector::new();
        let cache = connector.connect(&[]).await.unwrap();
        assert_eq!(cache.delete("nope").await, Err(CacheError::Miss));
    }
}
