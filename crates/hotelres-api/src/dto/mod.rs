//! Data Transfer Objects (DTOs) for API requests and responses

pub mod inventory;

pub use inventory::*;
