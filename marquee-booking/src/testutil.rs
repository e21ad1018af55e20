use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Mutex;
use uuid::Uuid;

use marquee_core::{EventPublisher, PublishError};
use marquee_shared::{DomainEvent, EmailNotification, Show};

pub fn sample_show() -> Show {
    Show {
        id: Uuid::new_v4(),
        movie_title: "The Long Intermission".to_string(),
        starts_at: Utc::now() + Duration::hours(6),
        price_cents: 1450,
        created_at: Utc::now(),
    }
}

/// Event publisher that keeps everything it was handed, for assertions.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<DomainEvent>>,
    emails: Mutex<Vec<EmailNotification>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn emails(&self) -> Vec<EmailNotification> {
        self.emails.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn publish_email(&self, notification: &EmailNotification) -> Result<(), PublishError> {
        self.emails.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
