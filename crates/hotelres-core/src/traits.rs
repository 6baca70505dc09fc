//! Collaborator traits for the durable record store
//!
//! The availability engine only reads and inserts through these accessors;
//! the store is the authoritative source whenever the cache misses or fails.

use crate::error::AppError;
use crate::models::{CapacityRecord, ReservationRecord};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Capacity accessor
#[async_trait]
pub trait CapacityRepository: Send + Sync {
    /// Find the capacity record for one hotel
    async fn find_capacity(&self, hotel_id: &str) -> Result<Option<CapacityRecord>, AppError>;

    /// Find capacity records for several hotels in one query.
    ///
    /// Hotels without a record are simply absent from the result.
    async fn find_capacity_batch(
        &self,
        hotel_ids: &[String],
    ) -> Result<Vec<CapacityRecord>, AppError>;
}

/// Reservation accessor
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Find every record booked for exactly the segment `[in_date, out_date)`
    async fn find_reservation_segments(
        &self,
        hotel_id: &str,
        in_date: NaiveDate,
        out_date: NaiveDate,
    ) -> Result<Vec<ReservationRecord>, AppError>;

    /// Insert one segment record, returning the store-assigned id
    async fn insert_reservation(&self, record: &ReservationRecord) -> Result<i64, AppError>;
}

/// Full record store used by the availability engine
pub trait RecordStore: CapacityRepository + ReservationRepository + 'static {}

impl<T> RecordStore for T where T: CapacityRepository + ReservationRepository + 'static {}
