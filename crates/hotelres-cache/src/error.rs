//! Cache error taxonomy

use hotelres_core::AppError;
use std::time::Duration;
use thiserror::Error;

/// Outcome of a failed cache operation.
///
/// `Miss` and `NotStored` describe the state of the cache, not a fault, and
/// are never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache miss")]
    Miss,

    #[error("item not stored")]
    NotStored,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection validation failed: {0}")]
    Validation(String),

    #[error("cache backend error: {0}")]
    Backend(String),
}

impl CacheError {
    /// Whether the error reflects cache contents rather than a failure
    pub fn is_terminal(&self) -> bool {
        matches!(self, CacheError::Miss | CacheError::NotStored)
    }

    /// Whether the backend could not be reached or trusted
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            CacheError::Connection(_) | CacheError::Timeout(_) | CacheError::Validation(_)
        )
    }
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        if err.is_connection() {
            AppError::CacheConnection(err.to_string())
        } else {
            AppError::Cache(err.to_string())
        }
    }
}
