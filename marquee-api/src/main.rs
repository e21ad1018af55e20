use std::net::SocketAddr;
use std::sync::Arc;

use marquee_api::{app, state::{AppState, AuthConfig}, worker};
use marquee_booking::{BookingManager, PaymentStatusGate};
use marquee_core::{BookingStore, EventPublisher, ExpiryScheduler, SeatLedger, ShowStore, UserStore};
use marquee_store::{
    DbClient, EventProducer, RedisClient, StoreBookingRepository, StoreExpiryScheduler,
    StoreShowRepository, StoreUserRepository,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marquee_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = marquee_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Marquee API on port {}", config.server.port);

    // Postgres Connection
    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    // Redis Connection
    let redis_client = RedisClient::new(&config.redis.url)
        .await
        .expect("Failed to connect to Redis");
    let redis = Arc::new(redis_client);

    // Kafka Connection
    let kafka_producer = EventProducer::new(&config.kafka.brokers)
        .expect("Failed to create Kafka producer");
    let kafka = Arc::new(kafka_producer);

    // Repositories over the shared pool
    let shows: Arc<dyn ShowStore> = Arc::new(StoreShowRepository::new(db.pool.clone()));
    let ledger: Arc<dyn SeatLedger> = Arc::new(StoreShowRepository::new(db.pool.clone()));
    let bookings: Arc<dyn BookingStore> = Arc::new(StoreBookingRepository::new(db.pool.clone()));
    let users: Arc<dyn UserStore> = Arc::new(StoreUserRepository::new(db.pool.clone()));
    let scheduler: Arc<dyn ExpiryScheduler> = Arc::new(StoreExpiryScheduler::new(db.pool.clone()));
    let events: Arc<dyn EventPublisher> = kafka.clone();

    let manager = Arc::new(BookingManager::new(
        shows.clone(),
        bookings.clone(),
        ledger.clone(),
        scheduler.clone(),
        events.clone(),
        config.business_rules.hold_window_seconds,
    ));
    let gate = Arc::new(PaymentStatusGate::new(bookings.clone(), events.clone()));

    // SSE Broadcast Channel
    let (sse_tx, _) = tokio::sync::broadcast::channel(100);

    let metrics = Arc::new(marquee_api::metrics::Metrics::new().expect("Failed to build metrics"));

    // Background workers, wired explicitly at startup.
    tokio::spawn(worker::start_expiry_worker(
        scheduler.clone(),
        gate.clone(),
        redis.clone(),
        sse_tx.clone(),
        metrics.clone(),
        config.business_rules.expiry_poll_seconds,
        config.business_rules.expiry_batch_size,
    ));
    tokio::spawn(worker::start_confirmation_worker(
        config.kafka.brokers.clone(),
        config.kafka.consumer_group.clone(),
        bookings.clone(),
        shows.clone(),
        users.clone(),
        kafka.clone(),
    ));

    let app_state = AppState {
        redis,
        shows,
        ledger,
        bookings,
        users,
        manager,
        gate,
        sse_tx,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        business_rules: config.business_rules.clone(),
        metrics,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
