//! Domain models for the inventory service
//!
//! This module contains all the core domain models used throughout the application.

pub mod availability;
pub mod capacity;
pub mod date_range;
pub mod reservation;

pub use availability::{AvailabilityResult, ReservationOutcome};
pub use capacity::{rooms_fit, CapacityRecord};
pub use date_range::{DateRange, DateSegment, ISO_DATE_FORMAT};
pub use reservation::ReservationRecord;
