//! Cache key builders and value codecs
//!
//! Provides the key naming patterns shared by every reader and writer of the
//! inventory cache. The formats are fixed and must stay bit-exact.
//!
//! # Key Patterns
//!
//! - `{hotel_id}_cap` - Total rooms of a hotel
//! - `{hotel_id}_{YYYY-MM-DD}_{YYYY-MM-DD}` - Rooms booked for one night
//! - `connection_test_{uuid}` - Short-lived connection probe
//!
//! Both entity payloads are ASCII decimal integers.
//!
//! # Example
//!
//! ```
//! use hotelres_cache::keys;
//!
//! assert_eq!(keys::capacity_key("H1"), "H1_cap");
//! ```

use hotelres_core::models::{DateSegment, ISO_DATE_FORMAT};
use uuid::Uuid;

/// Suffix for hotel capacity keys
///
/// Format: `{hotel_id}_cap`
pub const CAPACITY_SUFFIX: &str = "cap";

/// Prefix for connection probe keys
///
/// Format: `connection_test_{uuid}`
pub const PROBE_PREFIX: &str = "connection_test";

/// Value written and read back by connection probes
pub const PROBE_VALUE: &str = "test_value";

/// Largest count a cached payload may hold; room counts are `i32` in the store
pub const MAX_COUNT: i64 = i32::MAX as i64;

/// Build the capacity key for a hotel
///
/// # Example
///
/// ```
/// use hotelres_cache::keys::capacity_key;
///
/// assert_eq!(capacity_key("42"), "42_cap");
/// ```
pub fn capacity_key(hotel_id: &str) -> String {
    format!("{}_{}", hotel_id, CAPACITY_SUFFIX)
}

/// Build the booked-count key for one night of a hotel
///
/// Format: `{hotel_id}_{in}_{out}` with both dates as `YYYY-MM-DD`
pub fn segment_key(hotel_id: &str, segment: &DateSegment) -> String {
    format!(
        "{}_{}_{}",
        hotel_id,
        segment.in_date.format(ISO_DATE_FORMAT),
        segment.out_date.format(ISO_DATE_FORMAT)
    )
}

/// Build a unique probe key
pub fn probe_key() -> String {
    format!("{}_{}", PROBE_PREFIX, Uuid::new_v4().simple())
}

/// Encode an integer payload
pub fn encode_count(count: i64) -> String {
    count.to_string()
}

/// Decode an integer payload.
///
/// Returns `None` if the value is not a decimal integer in `0..=MAX_COUNT`,
/// so a corrupt entry reads like a miss.
pub fn decode_count(value: &str) -> Option<i64> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|count| (0..=MAX_COUNT).contains(count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn segment(day: &str) -> DateSegment {
        DateSegment::starting(NaiveDate::parse_from_str(day, ISO_DATE_FORMAT).unwrap())
    }

    #[test]
    fn test_capacity_key() {
        assert_eq!(capacity_key("H1"), "H1_cap");
        assert_eq!(capacity_key("17"), "17_cap");
    }

    #[test]
    fn test_segment_key() {
        assert_eq!(
            segment_key("H1", &segment("2024-06-01")),
            "H1_2024-06-01_2024-06-02"
        );
        assert_eq!(
            segment_key("9", &segment("2024-12-31")),
            "9_2024-12-31_2025-01-01"
        );
    }

    #[test]
    fn test_namespaces_disjoint() {
        let cap = capacity_key("H1");
        let seg = segment_key("H1", &segment("2024-06-01"));
        assert_ne!(cap, seg);
        assert!(cap.ends_with("_cap"));
        assert!(!seg.ends_with("_cap"));
    }

    #[test]
    fn test_probe_keys_unique() {
        let a = probe_key();
        let b = probe_key();
        assert!(a.starts_with("connection_test_"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_count_codec() {
        assert_eq!(encode_count(10), "10");
        assert_eq!(decode_count("10"), Some(10));
        assert_eq!(decode_count(" 7 "), Some(7));
        assert_eq!(decode_count("ten"), None);
        assert_eq!(decode_count(""), None);
    }

    #[test]
    fn test_out_of_range_counts_are_unreadable() {
        assert_eq!(decode_count("0"), Some(0));
        assert_eq!(decode_count("2147483647"), Some(MAX_COUNT));
        assert_eq!(decode_count("-100"), None);
        assert_eq!(decode_count("2147483648"), None);
        assert_eq!(decode_count(&i64::MAX.to_string()), None);
    }
}
