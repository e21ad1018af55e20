use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use marquee_core::{
    BookingStore, EventPublisher, ExpiryScheduler, LedgerError, SchedulerError, SeatLedger,
    ShowStore, StoreError,
};
use marquee_shared::{Booking, DomainEvent};

#[derive(Debug, Clone)]
pub struct HoldRequest {
    pub show_id: Uuid,
    pub user_id: String,
    pub seats: Vec<String>,
}

/// Creates holds: a pending booking, its scheduled expiry check and the seat
/// reservation, in that order.
///
/// The ordering is deliberate. The expiry task is durable before any seat is
/// touched, so whatever step fails or crashes afterwards, the scheduled
/// firing eventually sweeps the partial hold away (release is idempotent and
/// a missing booking is a no-op at fire time).
pub struct BookingManager {
    shows: Arc<dyn ShowStore>,
    bookings: Arc<dyn BookingStore>,
    ledger: Arc<dyn SeatLedger>,
    scheduler: Arc<dyn ExpiryScheduler>,
    events: Arc<dyn EventPublisher>,
    hold_window: Duration,
}

impl BookingManager {
    pub fn new(
        shows: Arc<dyn ShowStore>,
        bookings: Arc<dyn BookingStore>,
        ledger: Arc<dyn SeatLedger>,
        scheduler: Arc<dyn ExpiryScheduler>,
        events: Arc<dyn EventPublisher>,
        hold_window_seconds: u64,
    ) -> Self {
        Self {
            shows,
            bookings,
            ledger,
            scheduler,
            events,
            hold_window: Duration::seconds(hold_window_seconds as i64),
        }
    }

    pub fn hold_window(&self) -> Duration {
        self.hold_window
    }

    pub async fn create(&self, req: HoldRequest) -> Result<Booking, BookingError> {
        let seats = dedupe_preserving_order(req.seats);
        if seats.is_empty() {
            return Err(BookingError::NoSeatsRequested);
        }

        let show = self
            .shows
            .get(req.show_id)
            .await?
            .ok_or(BookingError::ShowNotFound(req.show_id))?;

        let booking = Booking {
            id: Uuid::new_v4(),
            show_id: show.id,
            user_id: req.user_id,
            amount_cents: show.price_cents * seats.len() as i32,
            seats,
            is_paid: false,
            created_at: Utc::now(),
        };

        self.bookings.create_pending(&booking).await?;
        self.scheduler
            .schedule(booking.id, booking.created_at + self.hold_window)
            .await?;

        if let Err(err) = self
            .ledger
            .reserve(booking.show_id, &booking.seats, booking.id)
            .await
        {
            // Take the pending record back out through the same conditional
            // delete the expiry path uses; the stale task fires as a no-op.
            if let Err(cleanup) = self.bookings.release_if_pending(booking.id).await {
                warn!(booking_id = %booking.id, error = %cleanup, "failed to clean up booking after reserve failure");
            }
            return Err(err.into());
        }

        if let Err(err) = self
            .events
            .publish(&DomainEvent::BookingCreated {
                booking_id: booking.id,
                show_id: booking.show_id,
                created_at: booking.created_at,
            })
            .await
        {
            // The hold stands either way; the bus catches up on its own.
            warn!(booking_id = %booking.id, error = %err, "failed to publish booking.created");
        }

        info!(
            booking_id = %booking.id,
            show_id = %booking.show_id,
            seats = booking.seats.len(),
            "hold created"
        );
        Ok(booking)
    }
}

fn dedupe_preserving_order(seats: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    seats
        .into_iter()
        .filter(|seat| seen.insert(seat.clone()))
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("no seats requested")]
    NoSeatsRequested,

    #[error("show not found: {0}")]
    ShowNotFound(Uuid),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl BookingError {
    /// True for the caller-visible rejection the booking UI handles by
    /// prompting for different seats.
    pub fn is_seat_conflict(&self) -> bool {
        matches!(self, BookingError::Ledger(LedgerError::SeatConflict { .. }))
    }
}
