//! HTTP request handlers

pub mod health;
pub mod inventory;

pub use health::health_check;
pub use inventory::configure as configure_inventory;
