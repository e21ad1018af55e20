use std::sync::Arc;
use tokio::sync::broadcast;

use marquee_booking::{BookingManager, PaymentStatusGate};
use marquee_core::{BookingStore, SeatLedger, ShowStore, UserStore};
use marquee_shared::SeatActivityEvent;
use marquee_store::app_config::BusinessRules;
use marquee_store::RedisClient;

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub redis: Arc<RedisClient>,
    pub shows: Arc<dyn ShowStore>,
    pub ledger: Arc<dyn SeatLedger>,
    pub bookings: Arc<dyn BookingStore>,
    pub users: Arc<dyn UserStore>,
    pub manager: Arc<BookingManager>,
    pub gate: Arc<PaymentStatusGate>,
    pub sse_tx: broadcast::Sender<SeatActivityEvent>,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
    pub metrics: Arc<Metrics>,
}
