use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single screening of a movie. Seat occupancy is tracked separately in the
/// per-show occupant mapping (seat -> holding booking); a seat that is absent
/// from the mapping is available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Show {
    pub id: Uuid,
    pub movie_title: String,
    pub starts_at: DateTime<Utc>,
    pub price_cents: i32,
    pub created_at: DateTime<Utc>,
}
