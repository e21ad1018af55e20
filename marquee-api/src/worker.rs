use chrono::Utc;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};

use marquee_booking::{confirmation, PaymentStatusGate};
use marquee_core::{
    BookingStore, EventPublisher, ExpireOutcome, ExpiryScheduler, ShowStore, UserStore,
};
use marquee_shared::{DomainEvent, SeatAction, SeatActivityEvent};
use marquee_store::{EventProducer, RedisClient};

use crate::metrics::Metrics;

/// Poll the durable expiry queue and push every due task through the gate.
///
/// A task is completed only after the gate ran; a transient failure leaves it
/// in the queue, so the next tick redelivers it. Firing twice is safe: the
/// second run finds nothing pending and retains.
pub async fn start_expiry_worker(
    scheduler: Arc<dyn ExpiryScheduler>,
    gate: Arc<PaymentStatusGate>,
    redis: Arc<RedisClient>,
    sse_tx: broadcast::Sender<SeatActivityEvent>,
    metrics: Arc<Metrics>,
    poll_seconds: u64,
    batch_size: i64,
) {
    info!("Expiry worker started, polling every {}s", poll_seconds);
    let mut tick = interval(Duration::from_secs(poll_seconds));

    loop {
        tick.tick().await;
        let now = Utc::now();

        let tasks = match scheduler.due(now, batch_size).await {
            Ok(tasks) => tasks,
            Err(e) => {
                error!("Failed to read due expiry tasks: {}", e);
                continue;
            }
        };

        for task in tasks {
            match gate.expire(task.booking_id).await {
                Ok(ExpireOutcome::Released { show_id, seats }) => {
                    metrics.holds_released.inc();
                    if let Err(e) = redis.invalidate_seat_map(&show_id).await {
                        warn!(show_id = %show_id, error = %e, "failed to invalidate seat map cache");
                    }
                    let _ = sse_tx.send(SeatActivityEvent {
                        show_id,
                        seats,
                        booking_id: task.booking_id,
                        action: SeatAction::Released,
                        at: now.timestamp(),
                    });
                    if let Err(e) = scheduler.complete(task.booking_id).await {
                        warn!(booking_id = %task.booking_id, error = %e, "failed to complete expiry task, will redeliver");
                    }
                }
                Ok(ExpireOutcome::Retained) => {
                    debug!(booking_id = %task.booking_id, "expiry fired with nothing to do");
                    if let Err(e) = scheduler.complete(task.booking_id).await {
                        warn!(booking_id = %task.booking_id, error = %e, "failed to complete expiry task, will redeliver");
                    }
                }
                Err(e) => {
                    // Leave the task in the queue; at-least-once redelivery
                    // handles the retry.
                    error!(booking_id = %task.booking_id, error = %e, "expiry firing failed");
                }
            }
        }
    }
}

/// Consume `bookings.confirmed` and hand a composed confirmation email to the
/// external mail collaborator.
pub async fn start_confirmation_worker(
    brokers: String,
    group_id: String,
    bookings: Arc<dyn BookingStore>,
    shows: Arc<dyn ShowStore>,
    users: Arc<dyn UserStore>,
    producer: Arc<EventProducer>,
) {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &brokers)
        .set("group.id", &group_id)
        .set("enable.auto.commit", "true")
        .set("auto.offset.reset", "earliest")
        .create()
        .expect("Consumer creation failed");

    consumer
        .subscribe(&["bookings.confirmed"])
        .expect("Can't subscribe");

    info!("Confirmation worker started, listening for paid bookings...");

    loop {
        match consumer.recv().await {
            Err(e) => error!("Kafka error: {}", e),
            Ok(m) => {
                let Some(Ok(payload)) = m.payload_view::<str>() else {
                    error!("Error reading payload");
                    continue;
                };
                let event: DomainEvent = match serde_json::from_str(payload) {
                    Ok(event) => event,
                    Err(e) => {
                        error!("Malformed event payload: {}", e);
                        continue;
                    }
                };
                let DomainEvent::BookingConfirmed { booking_id } = event else {
                    continue;
                };

                info!("Composing confirmation email for booking {}", booking_id);
                if let Err(e) = send_confirmation(&*bookings, &*shows, &*users, &producer, booking_id).await
                {
                    error!(booking_id = %booking_id, "Failed to send confirmation: {}", e);
                }
            }
        }
    }
}

async fn send_confirmation(
    bookings: &dyn BookingStore,
    shows: &dyn ShowStore,
    users: &dyn UserStore,
    producer: &EventProducer,
    booking_id: uuid::Uuid,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let Some(booking) = bookings.get(booking_id).await? else {
        warn!(booking_id = %booking_id, "confirmed booking no longer exists");
        return Ok(());
    };
    let Some(show) = shows.get(booking.show_id).await? else {
        warn!(show_id = %booking.show_id, "show missing for confirmed booking");
        return Ok(());
    };
    let Some(user) = users.get(&booking.user_id).await? else {
        warn!(user_id = %booking.user_id, "no mirrored user for confirmed booking, skipping email");
        return Ok(());
    };

    let email = confirmation::confirmation_email(&booking, &show, &user);
    producer.publish_email(&email).await?;
    Ok(())
}
