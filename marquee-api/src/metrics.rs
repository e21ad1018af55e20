use axum::extract::State;
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

use crate::error::AppError;
use crate::state::AppState;

/// Counters owned by the app state, not a process-wide default registry.
pub struct Metrics {
    pub registry: Registry,
    pub bookings_created: IntCounter,
    pub seat_conflicts: IntCounter,
    pub holds_released: IntCounter,
    pub payments_confirmed: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let bookings_created =
            IntCounter::new("marquee_bookings_created_total", "Holds successfully created")?;
        let seat_conflicts = IntCounter::new(
            "marquee_seat_conflicts_total",
            "Reservations rejected because a requested seat was held",
        )?;
        let holds_released = IntCounter::new(
            "marquee_holds_released_total",
            "Unpaid holds released by the expiry worker",
        )?;
        let payments_confirmed = IntCounter::new(
            "marquee_payments_confirmed_total",
            "Bookings settled by payment webhooks",
        )?;

        registry.register(Box::new(bookings_created.clone()))?;
        registry.register(Box::new(seat_conflicts.clone()))?;
        registry.register(Box::new(holds_released.clone()))?;
        registry.register(Box::new(payments_confirmed.clone()))?;

        Ok(Self {
            registry,
            bookings_created,
            seat_conflicts,
            holds_released,
            payments_confirmed,
        })
    }
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, AppError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&state.metrics.registry.gather(), &mut buffer)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| AppError::InternalServerError(e.to_string()))
}
