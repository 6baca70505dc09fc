//! Hotelres Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the hotel room inventory system. It includes:
//!
//! - Domain models (capacity, reservation segments, date ranges)
//! - Collaborator traits for the durable record store
//! - Unified error handling with HTTP response mapping
//! - Application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod traits;

pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
