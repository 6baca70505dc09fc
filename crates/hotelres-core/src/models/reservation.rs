//! Reservation segment model
//!
//! A booking over `[in, out)` is stored as one record per night, each
//! covering a single `[day, day + 1)` segment.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::date_range::DateSegment;

/// One-night occupancy record.
///
/// Created only by a successful reservation commit; never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRecord {
    pub hotel_id: String,
    pub customer_name: String,
    pub in_date: NaiveDate,
    pub out_date: NaiveDate,
    pub room_count: i32,
}

impl ReservationRecord {
    /// Build the record for a single segment of a booking
    pub fn for_segment(
        hotel_id: impl Into<String>,
        customer_name: impl Into<String>,
        segment: DateSegment,
        room_count: i32,
    ) -> Self {
        Self {
            hotel_id: hotel_id.into(),
            customer_name: customer_name.into(),
            in_date: segment.in_date,
            out_date: segment.out_date,
            room_count,
        }
    }

    /// Sum of booked rooms across records matching one segment
    pub fn total_rooms(records: &[ReservationRecord]) -> i64 {
        records.iter().map(|r| i64::from(r.room_count)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_for_segment() {
        let segment = DateSegment::starting(day("2024-06-01"));
        let record = ReservationRecord::for_segment("H1", "Alice", segment, 2);

        assert_eq!(record.in_date, day("2024-06-01"));
        assert_eq!(record.out_date, day("2024-06-02"));
        assert_eq!(record.customer_name, "Alice");
    }

    #[test]
    fn test_total_rooms() {
        let segment = DateSegment::starting(day("2024-06-01"));
        let records = vec![
            ReservationRecord::for_segment("H1", "a", segment, 5),
            ReservationRecord::for_segment("H1", "b", segment, 3),
        ];
        assert_eq!(ReservationRecord::total_rooms(&records), 8);
        assert_eq!(ReservationRecord::total_rooms(&[]), 0);
    }
}
