use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use marquee_booking::HoldRequest;
use marquee_core::BookingStore;
use marquee_shared::{SeatAction, SeatActivityEvent};

use crate::auth::{bearer_token, decode_claims};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CreateBookingRequest {
    show_id: Uuid,
    seats: Vec<String>,
}

#[derive(Debug, Serialize)]
struct BookingResponse {
    booking_id: Uuid,
    status: String,
    amount_cents: i32,
    hold_expires_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct BookingDetails {
    booking_id: Uuid,
    show_id: Uuid,
    seats: Vec<String>,
    status: String,
    amount_cents: i32,
    created_at: chrono::DateTime<Utc>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/{id}", get(get_booking))
}

async fn create_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::AuthenticationError("missing bearer token".to_string()))?;
    let claims = decode_claims(token, &state.auth.secret)
        .map_err(|e| AppError::AuthenticationError(e.to_string()))?;

    let booking = state
        .manager
        .create(HoldRequest {
            show_id: req.show_id,
            user_id: claims.sub,
            seats: req.seats,
        })
        .await
        .map_err(|err| {
            if err.is_seat_conflict() {
                state.metrics.seat_conflicts.inc();
            }
            AppError::from_booking(err)
        })?;

    state.metrics.bookings_created.inc();

    // Best-effort cache/stream fan-out; the hold is already durable.
    if let Err(e) = state.redis.invalidate_seat_map(&booking.show_id).await {
        warn!(show_id = %booking.show_id, error = %e, "failed to invalidate seat map cache");
    }
    let _ = state.sse_tx.send(SeatActivityEvent {
        show_id: booking.show_id,
        seats: booking.seats.clone(),
        booking_id: booking.id,
        action: SeatAction::Held,
        at: booking.created_at.timestamp(),
    });

    Ok(Json(BookingResponse {
        booking_id: booking.id,
        status: booking.state().to_string(),
        amount_cents: booking.amount_cents,
        hold_expires_at: booking.created_at + state.manager.hold_window(),
    }))
}

async fn get_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingDetails>, AppError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::AuthenticationError("missing bearer token".to_string()))?;
    let claims = decode_claims(token, &state.auth.secret)
        .map_err(|e| AppError::AuthenticationError(e.to_string()))?;

    let booking = state
        .bookings
        .get(booking_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError(format!("booking not found: {}", booking_id)))?;

    if booking.user_id != claims.sub && claims.role != "admin" {
        return Err(AppError::AuthorizationError(
            "booking does not belong to you".to_string(),
        ));
    }

    Ok(Json(BookingDetails {
        booking_id: booking.id,
        show_id: booking.show_id,
        seats: booking.seats.clone(),
        status: booking.state().to_string(),
        amount_cents: booking.amount_cents,
        created_at: booking.created_at,
    }))
}
