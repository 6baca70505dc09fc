//! Inventory DTOs
//!
//! Request and response types for the booking and availability endpoints.
//! Dates travel as `YYYY-MM-DD` strings and are parsed by the engine.

use hotelres_core::models::{AvailabilityResult, ReservationOutcome};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Booking request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReservationRequest {
    /// Hotel to book
    #[validate(length(min = 1, max = 64, message = "Hotel id is required"))]
    pub hotel_id: String,

    /// Name recorded on every night of the booking
    #[validate(length(min = 1, max = 128, message = "Customer name is required"))]
    pub customer_name: String,

    /// First night (`YYYY-MM-DD`)
    #[validate(length(equal = 10, message = "Date must be YYYY-MM-DD"))]
    pub in_date: String,

    /// Day after the last night (`YYYY-MM-DD`)
    #[validate(length(equal = 10, message = "Date must be YYYY-MM-DD"))]
    pub out_date: String,

    /// Rooms per night
    #[validate(range(min = 1, message = "At least one room is required"))]
    pub room_count: i32,
}

/// Booking response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationResponse {
    /// Whether the booking was committed
    pub accepted: bool,
    /// Booked hotel, absent when rejected
    pub hotel_id: Option<String>,
}

impl From<ReservationOutcome> for ReservationResponse {
    fn from(outcome: ReservationOutcome) -> Self {
        Self {
            accepted: outcome.accepted,
            hotel_id: outcome.hotel_id,
        }
    }
}

/// Availability query
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AvailabilityRequest {
    /// Hotels to check
    #[validate(length(min = 1, message = "At least one hotel id is required"))]
    pub hotel_ids: Vec<String>,

    /// First night (`YYYY-MM-DD`)
    #[validate(length(equal = 10, message = "Date must be YYYY-MM-DD"))]
    pub in_date: String,

    /// Day after the last night (`YYYY-MM-DD`)
    #[validate(length(equal = 10, message = "Date must be YYYY-MM-DD"))]
    pub out_date: String,

    /// Rooms per night
    #[validate(range(min = 1, message = "At least one room is required"))]
    pub room_count: i32,
}

/// Availability answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    /// Hotels with room on every night, in request order
    pub available_hotel_ids: Vec<String>,
}

impl From<AvailabilityResult> for AvailabilityResponse {
    fn from(result: AvailabilityResult) -> Self {
        Self {
            available_hotel_ids: result.available_hotel_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking() -> ReservationRequest {
        ReservationRequest {
            hotel_id: "H1".to_string(),
            customer_name: "Alice".to_string(),
            in_date: "2024-06-01".to_string(),
            out_date: "2024-06-02".to_string(),
            room_count: 2,
        }
    }

    #[test]
    fn test_reservation_request_validation() {
        assert!(booking().validate().is_ok());

        let mut req = booking();
        req.room_count = 0;
        assert!(req.validate().is_err());

        let mut req = booking();
        req.customer_name = String::new();
        assert!(req.validate().is_err());

        let mut req = booking();
        req.in_date = "2024-6-1".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_availability_request_requires_hotels() {
        let req = AvailabilityRequest {
            hotel_ids: vec![],
            in_date: "2024-06-01".to_string(),
            out_date: "2024-06-03".to_string(),
            room_count: 1,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_rejected_outcome_serializes_null_hotel() {
        let response = ReservationResponse::from(ReservationOutcome::rejected());
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["accepted"], false);
        assert!(json["hotel_id"].is_null());
    }
}
