use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{error, info};

use marquee_core::{EventPublisher, PublishError};
use marquee_shared::{DomainEvent, EmailNotification};

pub const EMAIL_TOPIC: &str = "notifications.email";

#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
}

impl EventProducer {
    pub fn new(brokers: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self { producer })
    }

    pub async fn send(
        &self,
        topic: &str,
        key: &str,
        payload: &str,
    ) -> Result<(), rdkafka::error::KafkaError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        match self
            .producer
            .send(record, Timeout::After(Duration::from_secs(0)))
            .await
        {
            Ok((partition, offset)) => {
                info!(
                    "Sent message to {}/{}: partition {} offset {}",
                    topic, key, partition, offset
                );
                Ok(())
            }
            Err((e, _msg)) => {
                error!("Failed to send message to {}: {}", topic, e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl EventPublisher for EventProducer {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError> {
        let payload = serde_json::to_string(event)
            .map_err(|e| PublishError::Unavailable(e.to_string()))?;
        self.send(event.topic(), &event.key(), &payload)
            .await
            .map_err(|e| PublishError::Unavailable(e.to_string()))
    }

    async fn publish_email(&self, notification: &EmailNotification) -> Result<(), PublishError> {
        let payload = serde_json::to_string(notification)
            .map_err(|e| PublishError::Unavailable(e.to_string()))?;
        self.send(EMAIL_TOPIC, &notification.to, &payload)
            .await
            .map_err(|e| PublishError::Unavailable(e.to_string()))
    }
}
