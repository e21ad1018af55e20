use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use marquee_core::{BookingStore, EventPublisher, ExpireOutcome, SettleOutcome, StoreError};
use marquee_shared::DomainEvent;

/// The payment status gate: owns the two terminal transitions of a booking.
///
/// Both transitions go through the store's conditional updates, so a settle
/// and an expiry firing racing on the same booking resolve to exactly one
/// terminal state. The gate itself only interprets outcomes.
pub struct PaymentStatusGate {
    bookings: Arc<dyn BookingStore>,
    events: Arc<dyn EventPublisher>,
}

impl PaymentStatusGate {
    pub fn new(bookings: Arc<dyn BookingStore>, events: Arc<dyn EventPublisher>) -> Self {
        Self { bookings, events }
    }

    /// Pending -> Paid, driven by the external payment collaborator.
    pub async fn settle(&self, booking_id: Uuid) -> Result<SettleOutcome, StoreError> {
        let outcome = self.bookings.mark_paid_if_pending(booking_id).await?;
        match &outcome {
            SettleOutcome::Confirmed(_) => {
                info!(booking_id = %booking_id, "payment recorded, booking confirmed");
                if let Err(err) = self
                    .events
                    .publish(&DomainEvent::BookingConfirmed { booking_id })
                    .await
                {
                    error!(booking_id = %booking_id, error = %err, "failed to publish bookings.confirmed");
                }
            }
            SettleOutcome::AlreadyPaid => {
                debug!(booking_id = %booking_id, "duplicate payment notification ignored");
            }
            SettleOutcome::NotFound => {
                // Payment raced the expiry firing and lost; the hold is gone
                // and must not be resurrected.
                warn!(booking_id = %booking_id, "payment completed for a booking that no longer exists");
            }
        }
        Ok(outcome)
    }

    /// Pending -> Released, driven by the scheduled expiry check.
    pub async fn expire(&self, booking_id: Uuid) -> Result<ExpireOutcome, StoreError> {
        let outcome = self.bookings.release_if_pending(booking_id).await?;
        match &outcome {
            ExpireOutcome::Released { show_id, seats } => {
                info!(
                    booking_id = %booking_id,
                    show_id = %show_id,
                    seats = seats.len(),
                    "unpaid hold expired, seats released"
                );
            }
            ExpireOutcome::Retained => {
                debug!(booking_id = %booking_id, "expiry fired with nothing to do");
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::{BookingManager, HoldRequest};
    use crate::testutil::{sample_show, RecordingPublisher};
    use chrono::Duration;
    use marquee_core::{ExpiryScheduler, SeatLedger, ShowStore};
    use marquee_ledger::MemoryLedger;
    use marquee_shared::Booking;

    async fn held_booking(
        ledger: &Arc<MemoryLedger>,
        events: &Arc<RecordingPublisher>,
        seats: &[&str],
    ) -> Booking {
        let show = sample_show();
        ShowStore::insert(ledger.as_ref(), &show).await.unwrap();
        let manager = BookingManager::new(
            ledger.clone(),
            ledger.clone(),
            ledger.clone(),
            ledger.clone(),
            events.clone(),
            600,
        );
        manager
            .create(HoldRequest {
                show_id: show.id,
                user_id: "user_1".to_string(),
                seats: seats.iter().map(|s| s.to_string()).collect(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn unpaid_hold_is_torn_down_at_expiry() {
        let ledger = Arc::new(MemoryLedger::new());
        let events = Arc::new(RecordingPublisher::default());
        let booking = held_booking(&ledger, &events, &["A1", "A2"]).await;
        let gate = PaymentStatusGate::new(ledger.clone(), events.clone());

        // Fire the due task the way the worker would, ten minutes later.
        let due = ledger
            .due(booking.created_at + Duration::minutes(10), 10)
            .await
            .unwrap();
        assert_eq!(due.len(), 1);
        let outcome = gate.expire(due[0].booking_id).await.unwrap();
        assert!(matches!(outcome, ExpireOutcome::Released { .. }));
        ledger.complete(due[0].booking_id).await.unwrap();

        assert!(ledger.occupants(booking.show_id).await.unwrap().is_empty());
        assert!(BookingStore::get(ledger.as_ref(), booking.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn paid_booking_survives_expiry_firing() {
        let ledger = Arc::new(MemoryLedger::new());
        let events = Arc::new(RecordingPublisher::default());
        let booking = held_booking(&ledger, &events, &["A1"]).await;
        let gate = PaymentStatusGate::new(ledger.clone(), events.clone());

        // Payment lands five minutes in.
        let settled = gate.settle(booking.id).await.unwrap();
        assert!(matches!(settled, SettleOutcome::Confirmed(_)));

        // The expiry check still fires at the ten-minute mark and must no-op.
        let outcome = gate.expire(booking.id).await.unwrap();
        assert_eq!(outcome, ExpireOutcome::Retained);
        assert_eq!(
            ledger.occupants(booking.show_id).await.unwrap().get("A1"),
            Some(&booking.id)
        );
        assert!(BookingStore::get(ledger.as_ref(), booking.id)
            .await
            .unwrap()
            .is_some());

        // Confirmation was published exactly once, after BookingCreated.
        let published = events.events();
        assert!(matches!(
            published.last(),
            Some(marquee_shared::DomainEvent::BookingConfirmed { booking_id }) if *booking_id == booking.id
        ));
    }

    #[tokio::test]
    async fn settle_and_expire_race_to_exactly_one_terminal_state() {
        for _ in 0..100 {
            let ledger = Arc::new(MemoryLedger::new());
            let events = Arc::new(RecordingPublisher::default());
            let booking = held_booking(&ledger, &events, &["A1"]).await;
            let gate = Arc::new(PaymentStatusGate::new(ledger.clone(), events.clone()));

            let settle = {
                let gate = gate.clone();
                let id = booking.id;
                tokio::spawn(async move { gate.settle(id).await })
            };
            let expire = {
                let gate = gate.clone();
                let id = booking.id;
                tokio::spawn(async move { gate.expire(id).await })
            };

            let settled = settle.await.unwrap().unwrap();
            let expired = expire.await.unwrap().unwrap();

            let paid_won = matches!(settled, SettleOutcome::Confirmed(_));
            let expiry_won = matches!(expired, ExpireOutcome::Released { .. });
            assert!(
                paid_won ^ expiry_won,
                "exactly one transition may win: settle={settled:?} expire={expired:?}"
            );

            let occupied = ledger.occupants(booking.show_id).await.unwrap();
            if paid_won {
                // Paid with seats retained.
                assert_eq!(occupied.get("A1"), Some(&booking.id));
                let stored = BookingStore::get(ledger.as_ref(), booking.id)
                    .await
                    .unwrap()
                    .unwrap();
                assert!(stored.is_paid);
            } else {
                // Released with seats freed, never both effects.
                assert!(occupied.is_empty());
                assert!(BookingStore::get(ledger.as_ref(), booking.id)
                    .await
                    .unwrap()
                    .is_none());
            }
        }
    }

    #[tokio::test]
    async fn expiry_for_unknown_booking_is_an_ordinary_no_op() {
        let ledger = Arc::new(MemoryLedger::new());
        let events = Arc::new(RecordingPublisher::default());
        let gate = PaymentStatusGate::new(ledger.clone(), events.clone());

        let outcome = gate.expire(Uuid::new_v4()).await.unwrap();
        assert_eq!(outcome, ExpireOutcome::Retained);
        assert!(events.events().is_empty());
    }
}
