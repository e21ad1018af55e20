use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use marquee_core::{
    BookingStore, ExpireOutcome, ExpiryScheduler, ExpiryTask, LedgerError, SchedulerError,
    SeatLedger, SettleOutcome, ShowStore, StoreError, UserStore,
};
use marquee_shared::{Booking, Show, User};

/// In-memory seat ledger, booking store and expiry queue behind one mutex
/// (suitable for single-process deployments and tests; the durable variants
/// live in marquee-store). The single lock is what makes the conditional
/// booking transitions atomic here.
pub struct MemoryLedger {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    shows: HashMap<Uuid, Show>,
    // show -> seat -> holding booking
    seats: HashMap<Uuid, HashMap<String, Uuid>>,
    bookings: HashMap<Uuid, Booking>,
    users: HashMap<String, User>,
    // booking -> fire_at
    tasks: HashMap<Uuid, DateTime<Utc>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, String> {
        self.state.lock().map_err(|_| "ledger lock poisoned".to_string())
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SeatLedger for MemoryLedger {
    async fn reserve(
        &self,
        show_id: Uuid,
        seats: &[String],
        holder: Uuid,
    ) -> Result<(), LedgerError> {
        let mut state = self.lock().map_err(LedgerError::Transient)?;
        if !state.shows.contains_key(&show_id) {
            return Err(LedgerError::ShowNotFound(show_id));
        }

        let occupied = state.seats.entry(show_id).or_default();
        let taken: Vec<String> = seats
            .iter()
            .filter(|seat| occupied.contains_key(*seat))
            .cloned()
            .collect();
        if !taken.is_empty() {
            return Err(LedgerError::SeatConflict { taken });
        }

        for seat in seats {
            occupied.insert(seat.clone(), holder);
        }
        Ok(())
    }

    async fn release(&self, show_id: Uuid, seats: &[String]) -> Result<(), LedgerError> {
        let mut state = self.lock().map_err(LedgerError::Transient)?;
        if let Some(occupied) = state.seats.get_mut(&show_id) {
            for seat in seats {
                occupied.remove(seat);
            }
        }
        Ok(())
    }

    async fn occupants(&self, show_id: Uuid) -> Result<HashMap<String, Uuid>, LedgerError> {
        let state = self.lock().map_err(LedgerError::Transient)?;
        Ok(state.seats.get(&show_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl BookingStore for MemoryLedger {
    async fn create_pending(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut state = self.lock().map_err(StoreError::Transient)?;
        if state.bookings.contains_key(&booking.id) {
            return Err(StoreError::Transient(format!(
                "booking {} already exists",
                booking.id
            )));
        }
        state.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError> {
        let state = self.lock().map_err(StoreError::Transient)?;
        Ok(state.bookings.get(&booking_id).cloned())
    }

    async fn mark_paid_if_pending(&self, booking_id: Uuid) -> Result<SettleOutcome, StoreError> {
        let mut state = self.lock().map_err(StoreError::Transient)?;
        match state.bookings.get_mut(&booking_id) {
            None => Ok(SettleOutcome::NotFound),
            Some(booking) if booking.is_paid => Ok(SettleOutcome::AlreadyPaid),
            Some(booking) => {
                booking.is_paid = true;
                Ok(SettleOutcome::Confirmed(booking.clone()))
            }
        }
    }

    async fn release_if_pending(&self, booking_id: Uuid) -> Result<ExpireOutcome, StoreError> {
        let mut state = self.lock().map_err(StoreError::Transient)?;
        match state.bookings.get(&booking_id) {
            None => Ok(ExpireOutcome::Retained),
            Some(booking) if booking.is_paid => Ok(ExpireOutcome::Retained),
            Some(_) => {
                // The unpaid check and the removal happen under the same lock,
                // so a concurrent settle cannot interleave.
                let booking = state
                    .bookings
                    .remove(&booking_id)
                    .ok_or_else(|| StoreError::Transient("booking vanished mid-release".into()))?;
                if let Some(occupied) = state.seats.get_mut(&booking.show_id) {
                    for seat in &booking.seats {
                        if occupied.get(seat) == Some(&booking_id) {
                            occupied.remove(seat);
                        }
                    }
                }
                Ok(ExpireOutcome::Released {
                    show_id: booking.show_id,
                    seats: booking.seats,
                })
            }
        }
    }
}

#[async_trait]
impl ShowStore for MemoryLedger {
    async fn insert(&self, show: &Show) -> Result<(), StoreError> {
        let mut state = self.lock().map_err(StoreError::Transient)?;
        state.shows.insert(show.id, show.clone());
        Ok(())
    }

    async fn get(&self, show_id: Uuid) -> Result<Option<Show>, StoreError> {
        let state = self.lock().map_err(StoreError::Transient)?;
        Ok(state.shows.get(&show_id).cloned())
    }
}

#[async_trait]
impl UserStore for MemoryLedger {
    async fn upsert(&self, user: &User) -> Result<(), StoreError> {
        let mut state = self.lock().map_err(StoreError::Transient)?;
        state.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<(), StoreError> {
        let mut state = self.lock().map_err(StoreError::Transient)?;
        state.users.remove(user_id);
        Ok(())
    }

    async fn get(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let state = self.lock().map_err(StoreError::Transient)?;
        Ok(state.users.get(user_id).cloned())
    }
}

#[async_trait]
impl ExpiryScheduler for MemoryLedger {
    async fn schedule(
        &self,
        booking_id: Uuid,
        fire_at: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        let mut state = self.lock().map_err(SchedulerError::Transient)?;
        state.tasks.entry(booking_id).or_insert(fire_at);
        Ok(())
    }

    async fn due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<ExpiryTask>, SchedulerError> {
        let state = self.lock().map_err(SchedulerError::Transient)?;
        let mut due: Vec<ExpiryTask> = state
            .tasks
            .iter()
            .filter(|(_, fire_at)| **fire_at <= now)
            .map(|(booking_id, fire_at)| ExpiryTask {
                booking_id: *booking_id,
                fire_at: *fire_at,
            })
            .collect();
        due.sort_by_key(|task| task.fire_at);
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn complete(&self, booking_id: Uuid) -> Result<(), SchedulerError> {
        let mut state = self.lock().map_err(SchedulerError::Transient)?;
        state.tasks.remove(&booking_id);
        Ok(())
    }
}
