use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Durable fire-at records for hold expiry, one per booking.
///
/// Scheduling is fire-and-forget: there is no cancellation API, the Payment
/// Status Gate decides at fire time whether anything needs doing. Tasks are
/// redelivered until `complete` is called, which gives at-least-once firing
/// across process restarts.
#[async_trait]
pub trait ExpiryScheduler: Send + Sync {
    /// Enqueue the expiry check for a booking. At most one task ever exists
    /// per booking id; scheduling again is a no-op.
    async fn schedule(&self, booking_id: Uuid, fire_at: DateTime<Utc>)
        -> Result<(), SchedulerError>;

    /// Tasks whose fire time has passed, oldest first.
    async fn due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<ExpiryTask>, SchedulerError>;

    /// Remove a task once its firing ran to completion. Not calling this
    /// (handler crashed, store briefly down) leaves the task for redelivery.
    async fn complete(&self, booking_id: Uuid) -> Result<(), SchedulerError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpiryTask {
    pub booking_id: Uuid,
    pub fire_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("transient store failure: {0}")]
    Transient(String),
}
