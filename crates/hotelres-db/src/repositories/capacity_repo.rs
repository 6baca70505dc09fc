//! Capacity repository implementation
//!
//! Read-only access to the `number` table holding each hotel's room count.

use async_trait::async_trait;
use hotelres_core::{models::CapacityRecord, traits::CapacityRepository, AppError, AppResult};
use sqlx::PgPool;
use std::time::Instant;
use tracing::{debug, error, instrument};

/// PostgreSQL implementation of CapacityRepository
#[derive(Clone)]
pub struct PgCapacityRepository {
    pool: PgPool,
}

impl PgCapacityRepository {
    /// Create a new capacity repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CapacityRepository for PgCapacityRepository {
    #[instrument(skip(self))]
    async fn find_capacity(&self, hotel_id: &str) -> AppResult<Option<CapacityRecord>> {
        let started = Instant::now();

        let result = sqlx::query_as::<sqlx::Postgres, CapacityRow>(
            r#"
            SELECT hotel_id, number_of_room
            FROM number
            WHERE hotel_id = $1
            "#,
        )
        .bind(hotel_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding capacity for {}: {}", hotel_id, e);
            AppError::Database(format!("Failed to find capacity: {}", e))
        })?;

        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            found = result.is_some(),
            "Capacity lookup"
        );
        Ok(result.map(Into::into))
    }

    #[instrument(skip(self), fields(hotels = hotel_ids.len()))]
    async fn find_capacity_batch(&self, hotel_ids: &[String]) -> AppResult<Vec<CapacityRecord>> {
        if hotel_ids.is_empty() {
            return Ok(Vec::new());
        }
        let started = Instant::now();

        let rows = sqlx::query_as::<sqlx::Postgres, CapacityRow>(
            r#"
            SELECT hotel_id, number_of_room
            FROM number
            WHERE hotel_id = ANY($1)
            "#,
        )
        .bind(hotel_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding capacities: {}", e);
            AppError::Database(format!("Failed to fetch capacities: {}", e))
        })?;

        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            found = rows.len(),
            "Capacity batch lookup"
        );
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(sqlx::FromRow)]
struct CapacityRow {
    hotel_id: String,
    number_of_room: i32,
}

impl From<CapacityRow> for CapacityRecord {
    fn from(row: CapacityRow) -> Self {
        Self {
            hotel_id: row.hotel_id,
            total_rooms: row.number_of_room,
        }
    }
}
