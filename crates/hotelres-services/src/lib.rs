//! Inventory services for the hotel reservation system
//!
//! This crate holds the availability engine that decides whether rooms fit
//! and commits bookings, on top of the resilient cache and the record store.
//!
//! # Architecture
//!
//! - The engine owns its store behind an `Arc` and a cloneable cache client
//! - Store misses repopulate the cache in background tasks that are never awaited
//! - Multi-hotel queries fan out one task per hotel and night and fan in
//!   through a counted channel
//!
//! # Services
//!
//! - `AvailabilityEngine` - Reservation commit and batched availability query
//! - `FanIn` - Counted result collection for spawned tasks

pub mod availability;
pub mod fanin;

pub use availability::{spawn_cache_fill, AvailabilityEngine};
pub use fanin::FanIn;
