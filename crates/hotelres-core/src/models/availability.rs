//! Results of the two exposed inventory operations

use serde::{Deserialize, Serialize};

/// Result of a booking attempt.
///
/// Insufficient capacity is a normal negative result, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationOutcome {
    pub accepted: bool,
    /// Booked hotel on success, `None` when rejected
    pub hotel_id: Option<String>,
}

impl ReservationOutcome {
    pub fn accepted(hotel_id: impl Into<String>) -> Self {
        Self {
            accepted: true,
            hotel_id: Some(hotel_id.into()),
        }
    }

    pub fn rejected() -> Self {
        Self {
            accepted: false,
            hotel_id: None,
        }
    }
}

/// Hotels that can take the requested rooms on every night of a range
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResult {
    pub available_hotel_ids: Vec<String>,
}
