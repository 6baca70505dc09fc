//! Date ranges and their one-night segments
//!
//! Capacity is accounted per calendar night. A requested stay `[in, out)` is
//! decomposed into consecutive `[d, d + 1)` segments, always in date order.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AppError;

/// Wire format for dates in requests and cache keys
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// A single night `[in_date, in_date + 1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DateSegment {
    pub in_date: NaiveDate,
    pub out_date: NaiveDate,
}

impl DateSegment {
    /// Segment for the night starting on `day`
    pub fn starting(day: NaiveDate) -> Self {
        Self {
            in_date: day,
            out_date: day + Days::new(1),
        }
    }
}

impl fmt::Display for DateSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.in_date.format(ISO_DATE_FORMAT),
            self.out_date.format(ISO_DATE_FORMAT)
        )
    }
}

/// A validated, non-empty stay `[in_date, out_date)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub in_date: NaiveDate,
    pub out_date: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting empty or inverted stays
    pub fn new(in_date: NaiveDate, out_date: NaiveDate) -> Result<Self, AppError> {
        if in_date >= out_date {
            return Err(AppError::InvalidInput(format!(
                "out date {} must be after in date {}",
                out_date.format(ISO_DATE_FORMAT),
                in_date.format(ISO_DATE_FORMAT)
            )));
        }
        Ok(Self { in_date, out_date })
    }

    /// Parse a range from two `YYYY-MM-DD` strings
    pub fn parse(in_iso: &str, out_iso: &str) -> Result<Self, AppError> {
        Self::new(parse_iso_date(in_iso)?, parse_iso_date(out_iso)?)
    }

    /// Number of nights in the stay
    pub fn nights(&self) -> i64 {
        (self.out_date - self.in_date).num_days()
    }

    /// One-night segments in date order
    pub fn segments(&self) -> impl Iterator<Item = DateSegment> + '_ {
        self.in_date
            .iter_days()
            .take_while(move |day| *day < self.out_date)
            .map(DateSegment::starting)
    }
}

/// Parse a strict ten-character ISO date
pub fn parse_iso_date(value: &str) -> Result<NaiveDate, AppError> {
    let trimmed = value.trim();
    if trimmed.len() != 10 {
        return Err(AppError::InvalidInput(format!(
            "date must be YYYY-MM-DD, got '{}'",
            value
        )));
    }
    NaiveDate::parse_from_str(trimmed, ISO_DATE_FORMAT)
        .map_err(|e| AppError::InvalidInput(format!("invalid date '{}': {}", value, e)))
}
