//! Reservation repository implementation
//!
//! Provides PostgreSQL-backed storage for one-night reservation records.
//! Segment lookups hit the `(hotel_id, in_date, out_date)` index.

use async_trait::async_trait;
use chrono::NaiveDate;
use hotelres_core::{
    models::ReservationRecord, traits::ReservationRepository, AppError, AppResult,
};
use sqlx::PgPool;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

/// PostgreSQL implementation of ReservationRepository
#[derive(Clone)]
pub struct PgReservationRepository {
    pool: PgPool,
}

impl PgReservationRepository {
    /// Create a new reservation repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationRepository for PgReservationRepository {
    #[instrument(skip(self))]
    async fn find_reservation_segments(
        &self,
        hotel_id: &str,
        in_date: NaiveDate,
        out_date: NaiveDate,
    ) -> AppResult<Vec<ReservationRecord>> {
        let started = Instant::now();

        let rows = sqlx::query_as::<sqlx::Postgres, ReservationRow>(
            r#"
            SELECT hotel_id, customer_name, in_date, out_date, number
            FROM reservation
            WHERE hotel_id = $1 AND in_date = $2 AND out_date = $3
            "#,
        )
        .bind(hotel_id)
        .bind(in_date)
        .bind(out_date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Database error finding reservations for {} {}..{}: {}",
                hotel_id, in_date, out_date, e
            );
            AppError::Database(format!("Failed to find reservations: {}", e))
        })?;

        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            records = rows.len(),
            "Reservation segment lookup"
        );
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(
        skip(self, record),
        fields(hotel_id = %record.hotel_id, in_date = %record.in_date)
    )]
    async fn insert_reservation(&self, record: &ReservationRecord) -> AppResult<i64> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO reservation (hotel_id, customer_name, in_date, out_date, number)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&record.hotel_id)
        .bind(&record.customer_name)
        .bind(record.in_date)
        .bind(record.out_date)
        .bind(record.room_count)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error inserting reservation: {}", e);
            AppError::Database(format!("Failed to insert reservation: {}", e))
        })?;

        info!(id, rooms = record.room_count, "Reservation segment stored");
        Ok(id)
    }
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    hotel_id: String,
    customer_name: String,
    in_date: NaiveDate,
    out_date: NaiveDate,
    number: i32,
}

impl From<ReservationRow> for ReservationRecord {
    fn from(row: ReservationRow) -> Self {
        Self {
            hotel_id: row.hotel_id,
            customer_name: row.customer_name,
            in_date: row.in_date,
            out_date: row.out_date,
            room_count: row.number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use hotelres_core::models::DateSegment;

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_insert_and_find_segment() {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/hotelres".to_string());
        let pool = create_pool(&database_url, Some(2)).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let repo = PgReservationRepository::new(pool);

        let day = NaiveDate::from_ymd_opt(2031, 3, 14).unwrap();
        let segment = DateSegment::starting(day);
        let hotel = format!("repo_test_{}", std::process::id());
        let before = repo
            .find_reservation_segments(&hotel, segment.in_date, segment.out_date)
            .await
            .unwrap();

        let record = ReservationRecord::for_segment(&hotel, "Alice", segment, 3);
        let id = repo.insert_reservation(&record).await.unwrap();
        assert!(id > 0);

        let after = repo
            .find_reservation_segments(&hotel, segment.in_date, segment.out_date)
            .await
            .unwrap();
        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(
            ReservationRecord::total_rooms(&after),
            ReservationRecord::total_rooms(&before) + 3
        );
    }
}
