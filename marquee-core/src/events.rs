use async_trait::async_trait;

use marquee_shared::{DomainEvent, EmailNotification};

/// Outbound edge of the system: domain events for other services, email
/// payloads for the external mail collaborator.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError>;

    async fn publish_email(&self, notification: &EmailNotification) -> Result<(), PublishError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("event bus unavailable: {0}")]
    Unavailable(String),
}
