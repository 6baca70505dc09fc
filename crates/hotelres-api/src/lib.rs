//! API layer for the hotel inventory service
//!
//! HTTP handlers for booking rooms and querying availability.

#![forbid(unsafe_code)]
#![warn(clippy::all, missing_docs)]

pub mod dto;
pub mod handlers;
pub mod service;

pub use dto::{AvailabilityRequest, AvailabilityResponse, ReservationRequest, ReservationResponse};
pub use handlers::{configure_inventory, health_check};
pub use service::ReservationService;
