//! Hotelres Database Layer
//!
//! This crate provides PostgreSQL access for the hotel inventory system. It includes:
//!
//! - Connection pool management with sqlx
//! - Embedded schema migrations
//! - Capacity and reservation repositories
//! - A combined record store used by the availability engine

pub mod pool;
pub mod repositories;
pub mod store;

pub use pool::{create_pool, create_pool_from_config, run_migrations};
pub use repositories::*;
pub use store::{seed_capacity, PgRecordStore};

// Re-export commonly used types
pub use hotelres_core::{AppError, AppResult};
pub use sqlx::PgPool;
