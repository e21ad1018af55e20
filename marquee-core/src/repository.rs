use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use marquee_shared::{Booking, Show, User};

/// Booking records and their two conditional transitions.
///
/// `mark_paid_if_pending` and `release_if_pending` are the race-resolution
/// points of the whole protocol: both are conditional on the same unpaid
/// flag, so for any one booking exactly one of them can win. Implementations
/// must apply each as a single atomic step against the store (one row update
/// / one transaction), never as separate read-then-write calls.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn create_pending(&self, booking: &Booking) -> Result<(), StoreError>;

    async fn get(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError>;

    /// Pending -> Paid. Returns `AlreadyPaid` when the flag was set before,
    /// `NotFound` when the booking no longer exists (released or never made).
    async fn mark_paid_if_pending(&self, booking_id: Uuid) -> Result<SettleOutcome, StoreError>;

    /// Pending -> Released: compare-and-delete keyed on the unpaid flag. On
    /// success the booking's seats are freed in the same atomic step and the
    /// record is gone for good. Paid or missing bookings are retained/no-op.
    async fn release_if_pending(&self, booking_id: Uuid) -> Result<ExpireOutcome, StoreError>;
}

#[derive(Debug, Clone, Serialize)]
pub enum SettleOutcome {
    Confirmed(Booking),
    AlreadyPaid,
    NotFound,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub enum ExpireOutcome {
    Released { show_id: Uuid, seats: Vec<String> },
    /// Already paid, or no such booking. The original system treated the two
    /// identically at fire time and so do we.
    Retained,
}

#[async_trait]
pub trait ShowStore: Send + Sync {
    async fn insert(&self, show: &Show) -> Result<(), StoreError>;

    async fn get(&self, show_id: Uuid) -> Result<Option<Show>, StoreError>;
}

/// Mirror of identity-provider accounts, written by lifecycle webhooks.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn upsert(&self, user: &User) -> Result<(), StoreError>;

    async fn delete(&self, user_id: &str) -> Result<(), StoreError>;

    async fn get(&self, user_id: &str) -> Result<Option<User>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("transient store failure: {0}")]
    Transient(String),
}
