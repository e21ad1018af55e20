use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

/// Per-show occupant mapping: seat identifier -> holding booking.
///
/// The only shared mutable resource in the system. Implementations must make
/// `reserve` all-or-nothing for a single request: after a crash mid-reserve,
/// either every requested seat is held or none is.
#[async_trait]
pub trait SeatLedger: Send + Sync {
    /// Insert every requested seat mapped to `holder`, or fail with
    /// `SeatConflict` and leave the show unchanged.
    async fn reserve(
        &self,
        show_id: Uuid,
        seats: &[String],
        holder: Uuid,
    ) -> Result<(), LedgerError>;

    /// Remove the given seat keys unconditionally. Removing an absent key is
    /// a no-op, so callers may retry freely.
    async fn release(&self, show_id: Uuid, seats: &[String]) -> Result<(), LedgerError>;

    /// Current occupant mapping for a show.
    async fn occupants(&self, show_id: Uuid) -> Result<HashMap<String, Uuid>, LedgerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("seats already held: {}", taken.join(", "))]
    SeatConflict { taken: Vec<String> },

    #[error("show not found: {0}")]
    ShowNotFound(Uuid),

    #[error("transient store failure: {0}")]
    Transient(String),
}
