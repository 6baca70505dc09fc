//! Process-wide limit on concurrent connection resets

use hotelres_core::config::RetryConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounds how many connection resets may run at once.
///
/// Created once at startup and shared by every `ResilientCache` clone.
#[derive(Debug, Clone)]
pub struct ResetLimiter {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl ResetLimiter {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.reset_concurrency)
    }

    /// Wait up to `wait` for a slot; `None` if the limiter stayed saturated
    pub async fn try_acquire_for(&self, wait: Duration) -> Option<OwnedSemaphorePermit> {
        match tokio::time::timeout(wait, Arc::clone(&self.permits).acquire_owned()).await {
            Ok(Ok(permit)) => Some(permit),
            _ => None,
        }
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
