use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One reservation attempt. While `is_paid` is false the booking is a hold:
/// every seat in `seats` appears in the show's occupant mapping pointing at
/// this booking, and a scheduled expiry check will tear the whole thing down
/// if payment never arrives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub show_id: Uuid,
    pub user_id: String,
    pub seats: Vec<String>,
    pub amount_cents: i32,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn state(&self) -> HoldState {
        if self.is_paid {
            HoldState::PAID
        } else {
            HoldState::PENDING
        }
    }
}

/// Gate states for a booking. RELEASED is terminal and observable only as the
/// absence of the record; it exists here so responses and logs can name it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HoldState {
    PENDING,
    PAID,
    RELEASED,
}

impl ToString for HoldState {
    fn to_string(&self) -> String {
        match self {
            HoldState::PENDING => "PENDING".to_string(),
            HoldState::PAID => "PAID".to_string(),
            HoldState::RELEASED => "RELEASED".to_string(),
        }
    }
}
