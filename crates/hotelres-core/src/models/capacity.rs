//! Hotel capacity model

use serde::{Deserialize, Serialize};

/// Total number of rooms a hotel can sell per night.
///
/// Provisioned out-of-band and only read by this service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityRecord {
    pub hotel_id: String,
    pub total_rooms: i32,
}

impl CapacityRecord {
    pub fn new(hotel_id: impl Into<String>, total_rooms: i32) -> Self {
        Self {
            hotel_id: hotel_id.into(),
            total_rooms,
        }
    }

    /// Whether `booked + requested` rooms fit in this hotel
    #[inline]
    pub fn fits(&self, booked: i64, requested: i64) -> bool {
        rooms_fit(booked, requested, i64::from(self.total_rooms))
    }
}

/// Whether `booked + requested` rooms fit in `total`.
///
/// An overflowing sum never fits.
#[inline]
pub fn rooms_fit(booked: i64, requested: i64, total: i64) -> bool {
    booked
        .checked_add(requested)
        .is_some_and(|needed| needed <= total)
}
