//! Inventory handlers
//!
//! HTTP handlers for booking and availability endpoints.

use actix_web::{web, HttpResponse};
use hotelres_core::AppError;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::dto::{
    AvailabilityRequest, AvailabilityResponse, ReservationRequest, ReservationResponse,
};
use crate::service::ReservationService;

/// Book rooms
///
/// POST /api/v1/reservations
#[instrument(skip(service, req), fields(hotel_id = %req.hotel_id))]
pub async fn make_reservation(
    service: web::Data<dyn ReservationService>,
    req: web::Json<ReservationRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Reservation validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let outcome = service
        .make_reservation(
            &req.hotel_id,
            &req.customer_name,
            &req.in_date,
            &req.out_date,
            req.room_count,
        )
        .await?;

    info!(accepted = outcome.accepted, "Reservation request handled");
    Ok(HttpResponse::Ok().json(ReservationResponse::from(outcome)))
}

/// Query availability for several hotels
///
/// POST /api/v1/availability
#[instrument(skip(service, req), fields(hotels = req.hotel_ids.len()))]
pub async fn check_availability(
    service: web::Data<dyn ReservationService>,
    req: web::Json<AvailabilityRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Availability validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let result = service
        .check_availability(&req.hotel_ids, &req.in_date, &req.out_date, req.room_count)
        .await?;

    debug!(
        available = result.available_hotel_ids.len(),
        "Availability request handled"
    );
    Ok(HttpResponse::Ok().json(AvailabilityResponse::from(result)))
}

/// Configure inventory routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/reservations", web::post().to(make_reservation))
        .route("/availability", web::post().to(check_availability));
}
