use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use marquee_core::{SettleOutcome, UserStore};
use marquee_shared::pii::Masked;
use marquee_shared::{DomainEvent, User};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/webhooks/identity", post(handle_identity_webhook))
        .route("/v1/webhooks/payments", post(handle_payment_webhook))
}

// ============================================================================
// Identity provider lifecycle events
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct IdentityWebhook {
    #[serde(rename = "type")]
    pub type_: String,
    pub data: IdentityUserData,
}

#[derive(Debug, Deserialize)]
pub struct IdentityUserData {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailAddress {
    pub email_address: String,
}

/// Translate the provider's payload into our tagged event, or None for event
/// kinds we don't mirror.
pub fn parse_identity_event(payload: &IdentityWebhook) -> Option<DomainEvent> {
    match payload.type_.as_str() {
        "user.created" | "user.updated" => {
            let email = payload.data.email_addresses.first()?.email_address.clone();
            let name = format!(
                "{} {}",
                payload.data.first_name.as_deref().unwrap_or_default(),
                payload.data.last_name.as_deref().unwrap_or_default()
            )
            .trim()
            .to_string();
            let user = User {
                id: payload.data.id.clone(),
                name,
                email: Masked(email),
                image_url: payload.data.image_url.clone(),
            };
            if payload.type_ == "user.created" {
                Some(DomainEvent::UserCreated(user))
            } else {
                Some(DomainEvent::UserUpdated(user))
            }
        }
        "user.deleted" => Some(DomainEvent::UserDeleted {
            user_id: payload.data.id.clone(),
        }),
        _ => None,
    }
}

/// POST /v1/webhooks/identity
/// Mirror identity-provider account lifecycle into the user store.
async fn handle_identity_webhook(
    State(state): State<AppState>,
    Json(payload): Json<IdentityWebhook>,
) -> Result<StatusCode, StatusCode> {
    info!("Received identity webhook: {} for {}", payload.type_, payload.data.id);

    let Some(event) = parse_identity_event(&payload) else {
        // Unknown or incomplete event kinds are acknowledged and skipped.
        warn!("ignoring identity event {}", payload.type_);
        return Ok(StatusCode::OK);
    };

    let result = match &event {
        DomainEvent::UserCreated(user) | DomainEvent::UserUpdated(user) => {
            state.users.upsert(user).await
        }
        DomainEvent::UserDeleted { user_id } => state.users.delete(user_id).await,
        _ => return Ok(StatusCode::OK),
    };

    result.map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(StatusCode::OK)
}

// ============================================================================
// Payment provider events
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PaymentWebhook {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub data: PaymentWebhookData,
}

#[derive(Debug, Deserialize)]
pub struct PaymentWebhookData {
    pub object: PaymentIntentObject,
}

#[derive(Debug, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    pub status: String,
    pub metadata: Option<serde_json::Value>,
}

/// POST /v1/webhooks/payments
/// Receive payment status updates from the payment provider. Success drives
/// the Pending -> Paid transition; failures and cancellations need no action
/// because the scheduled expiry check reclaims abandoned holds on its own.
async fn handle_payment_webhook(
    State(state): State<AppState>,
    Json(payload): Json<PaymentWebhook>,
) -> Result<StatusCode, StatusCode> {
    info!(
        "Received webhook: {} for intent {}",
        payload.type_, payload.data.object.id
    );

    if payload.type_ != "payment_intent.succeeded" {
        return Ok(StatusCode::OK);
    }

    let booking_id = payload
        .data
        .object
        .metadata
        .as_ref()
        .and_then(|m| m.get("booking_id"))
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(StatusCode::BAD_REQUEST)?;

    let outcome = state
        .gate
        .settle(booking_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if matches!(outcome, SettleOutcome::Confirmed(_)) {
        state.metrics.payments_confirmed.inc();
    }

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_created_payload_maps_to_typed_event() {
        let payload: IdentityWebhook = serde_json::from_str(
            r#"{
                "type": "user.created",
                "data": {
                    "id": "user_2x9",
                    "first_name": "Lena",
                    "last_name": "Okafor",
                    "email_addresses": [{"email_address": "lena@example.com"}],
                    "image_url": "https://img.example.com/u/2x9.png"
                }
            }"#,
        )
        .unwrap();

        match parse_identity_event(&payload) {
            Some(DomainEvent::UserCreated(user)) => {
                assert_eq!(user.id, "user_2x9");
                assert_eq!(user.name, "Lena Okafor");
                assert_eq!(user.email.as_inner(), "lena@example.com");
            }
            other => panic!("expected UserCreated, got {other:?}"),
        }
    }

    #[test]
    fn identity_deleted_payload_maps_without_profile_fields() {
        let payload: IdentityWebhook = serde_json::from_str(
            r#"{"type": "user.deleted", "data": {"id": "user_gone"}}"#,
        )
        .unwrap();

        assert!(matches!(
            parse_identity_event(&payload),
            Some(DomainEvent::UserDeleted { user_id }) if user_id == "user_gone"
        ));
    }

    #[test]
    fn unknown_identity_events_are_skipped() {
        let payload: IdentityWebhook = serde_json::from_str(
            r#"{"type": "session.created", "data": {"id": "sess_1"}}"#,
        )
        .unwrap();
        assert!(parse_identity_event(&payload).is_none());
    }

    #[test]
    fn payment_webhook_shape_deserializes() {
        let payload: PaymentWebhook = serde_json::from_str(
            r#"{
                "id": "evt_1",
                "type": "payment_intent.succeeded",
                "data": {
                    "object": {
                        "id": "pi_123",
                        "status": "succeeded",
                        "metadata": {"booking_id": "7f0e4a9c-88b2-4a62-b4a4-19a871a2b001"}
                    }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(payload.type_, "payment_intent.succeeded");
        assert_eq!(
            payload.data.object.metadata.unwrap()["booking_id"],
            "7f0e4a9c-88b2-4a62-b4a4-19a871a2b001"
        );
    }
}
