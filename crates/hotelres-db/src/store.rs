//! Combined record store over one pool

use async_trait::async_trait;
use chrono::NaiveDate;
use hotelres_core::{
    models::{CapacityRecord, ReservationRecord},
    traits::{CapacityRepository, ReservationRepository},
    AppError, AppResult,
};
use sqlx::PgPool;
use tracing::{error, info, instrument};

use crate::repositories::{PgCapacityRepository, PgReservationRepository};

/// Capacity and reservation access sharing one connection pool
#[derive(Clone)]
pub struct PgRecordStore {
    capacities: PgCapacityRepository,
    reservations: PgReservationRepository,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            capacities: PgCapacityRepository::new(pool.clone()),
            reservations: PgReservationRepository::new(pool),
        }
    }
}

#[async_trait]
impl CapacityRepository for PgRecordStore {
    async fn find_capacity(&self, hotel_id: &str) -> AppResult<Option<CapacityRecord>> {
        self.capacities.find_capacity(hotel_id).await
    }

    async fn find_capacity_batch(&self, hotel_ids: &[String]) -> AppResult<Vec<CapacityRecord>> {
        self.capacities.find_capacity_batch(hotel_ids).await
    }
}

#[async_trait]
impl ReservationRepository for PgRecordStore {
    async fn find_reservation_segments(
        &self,
        hotel_id: &str,
        in_date: NaiveDate,
        out_date: NaiveDate,
    ) -> AppResult<Vec<ReservationRecord>> {
        self.reservations
            .find_reservation_segments(hotel_id, in_date, out_date)
            .await
    }

    async fn insert_reservation(&self, record: &ReservationRecord) -> AppResult<i64> {
        self.reservations.insert_reservation(record).await
    }
}

/// Provision hotel capacities, leaving existing rows untouched.
///
/// Returns the number of rows inserted.
#[instrument(skip(pool, records), fields(records = records.len()))]
pub async fn seed_capacity(pool: &PgPool, records: &[CapacityRecord]) -> AppResult<u64> {
    let mut tx = pool.begin().await.map_err(|e| {
        error!("Failed to begin transaction: {}", e);
        AppError::Database(format!("Failed to begin transaction: {}", e))
    })?;

    let mut inserted = 0;
    for record in records {
        let result = sqlx::query(
            r#"
            INSERT INTO number (hotel_id, number_of_room)
            VALUES ($1, $2)
            ON CONFLICT (hotel_id) DO NOTHING
            "#,
        )
        .bind(&record.hotel_id)
        .bind(record.total_rooms)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error seeding capacity {}: {}", record.hotel_id, e);
            AppError::Database(format!("Failed to seed capacity: {}", e))
        })?;
        inserted += result.rows_affected();
    }

    tx.commit().await.map_err(|e| {
        error!("Failed to commit capacity seed: {}", e);
        AppError::Database(format!("Failed to commit transaction: {}", e))
    })?;

    info!(inserted, "Hotel capacities provisioned");
    Ok(inserted)
}
