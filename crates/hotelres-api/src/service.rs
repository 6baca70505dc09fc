//! Seam between the HTTP handlers and the availability engine

use async_trait::async_trait;
use hotelres_core::{
    models::{AvailabilityResult, ReservationOutcome},
    traits::RecordStore,
    AppResult,
};
use hotelres_services::AvailabilityEngine;

/// Operations the handlers need from the engine.
///
/// Registered as `web::Data<dyn ReservationService>`.
#[async_trait]
pub trait ReservationService: Send + Sync {
    /// Book rooms in one hotel for every night of `[in, out)`
    async fn make_reservation(
        &self,
        hotel_id: &str,
        customer_name: &str,
        in_date: &str,
        out_date: &str,
        room_count: i32,
    ) -> AppResult<ReservationOutcome>;

    /// Hotels that can take the rooms on every night of `[in, out)`
    async fn check_availability(
        &self,
        hotel_ids: &[String],
        in_date: &str,
        out_date: &str,
        room_count: i32,
    ) -> AppResult<AvailabilityResult>;
}

#[async_trait]
impl<S: RecordStore> ReservationService for AvailabilityEngine<S> {
    async fn make_reservation(
        &self,
        hotel_id: &str,
        customer_name: &str,
        in_date: &str,
        out_date: &str,
        room_count: i32,
    ) -> AppResult<ReservationOutcome> {
        AvailabilityEngine::make_reservation(
            self,
            hotel_id,
            customer_name,
            in_date,
            out_date,
            room_count,
        )
        .await
    }

    async fn check_availability(
        &self,
        hotel_ids: &[String],
        in_date: &str,
        out_date: &str,
        room_count: i32,
    ) -> AppResult<AvailabilityResult> {
        AvailabilityEngine::check_availability(self, hotel_ids, in_date, out_date, room_count)
            .await
    }
}
