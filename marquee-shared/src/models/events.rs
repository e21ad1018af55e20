use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::User;

/// Events carried on the bus, one tagged variant per kind. Handlers match on
/// the variant instead of pulling loose fields out of an untyped payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum DomainEvent {
    UserCreated(User),
    UserUpdated(User),
    UserDeleted {
        user_id: String,
    },
    BookingCreated {
        booking_id: Uuid,
        show_id: Uuid,
        created_at: DateTime<Utc>,
    },
    PaymentCompleted {
        booking_id: Uuid,
    },
    BookingConfirmed {
        booking_id: Uuid,
    },
}

impl DomainEvent {
    /// Kafka topic an event is published on.
    pub fn topic(&self) -> &'static str {
        match self {
            DomainEvent::UserCreated(_)
            | DomainEvent::UserUpdated(_)
            | DomainEvent::UserDeleted { .. } => "users.sync",
            DomainEvent::BookingCreated { .. } => "bookings.created",
            DomainEvent::PaymentCompleted { .. } => "bookings.payments",
            DomainEvent::BookingConfirmed { .. } => "bookings.confirmed",
        }
    }

    /// Partition key: the entity the event is about.
    pub fn key(&self) -> String {
        match self {
            DomainEvent::UserCreated(user) | DomainEvent::UserUpdated(user) => user.id.clone(),
            DomainEvent::UserDeleted { user_id } => user_id.clone(),
            DomainEvent::BookingCreated { booking_id, .. }
            | DomainEvent::PaymentCompleted { booking_id }
            | DomainEvent::BookingConfirmed { booking_id } => booking_id.to_string(),
        }
    }
}

/// Live seat-map update pushed to SSE subscribers of a show.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatActivityEvent {
    pub show_id: Uuid,
    pub seats: Vec<String>,
    pub booking_id: Uuid,
    pub action: SeatAction,
    pub at: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SeatAction {
    Held,
    Released,
}

/// Payload handed to the external mail collaborator on the
/// `notifications.email` topic. Delivery is not our concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailNotification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_round_trip_tagged() {
        let event = DomainEvent::BookingCreated {
            booking_id: Uuid::new_v4(),
            show_id: Uuid::new_v4(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"booking_created\""));
        let back: DomainEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.topic(), "bookings.created");
    }

    #[test]
    fn partition_key_tracks_entity() {
        let booking_id = Uuid::new_v4();
        let event = DomainEvent::PaymentCompleted { booking_id };
        assert_eq!(event.key(), booking_id.to_string());
        assert_eq!(event.topic(), "bookings.payments");
    }
}
