use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

use marquee_core::{SeatLedger, ShowStore};
use marquee_shared::Show;

use crate::auth::{bearer_token, decode_claims};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CreateShowRequest {
    movie_title: String,
    starts_at: DateTime<Utc>,
    price_cents: i32,
}

#[derive(Debug, Serialize)]
struct CreateShowResponse {
    show_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
struct SeatMapResponse {
    show_id: Uuid,
    occupied: HashMap<String, Uuid>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/shows", post(create_show))
        .route("/v1/shows/{id}/seats", get(get_seat_map))
        .route("/v1/shows/{id}/stream", get(stream_seat_activity))
}

async fn create_show(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Json(req): Json<CreateShowRequest>,
) -> Result<(StatusCode, Json<CreateShowResponse>), AppError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::AuthenticationError("missing bearer token".to_string()))?;
    let claims = decode_claims(token, &state.auth.secret)
        .map_err(|e| AppError::AuthenticationError(e.to_string()))?;
    if claims.role != "admin" {
        return Err(AppError::AuthorizationError(
            "admin role required".to_string(),
        ));
    }

    let show = Show {
        id: Uuid::new_v4(),
        movie_title: req.movie_title,
        starts_at: req.starts_at,
        price_cents: req.price_cents,
        created_at: Utc::now(),
    };
    state
        .shows
        .insert(&show)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok((StatusCode::CREATED, Json(CreateShowResponse { show_id: show.id })))
}

/// Occupant map for a show, served from the Redis cache when warm. Cache
/// trouble degrades to a ledger read; it never fails the request.
async fn get_seat_map(
    State(state): State<AppState>,
    Path(show_id): Path<Uuid>,
) -> Result<Json<SeatMapResponse>, AppError> {
    match state.redis.get_seat_map(&show_id).await {
        Ok(Some(cached)) => {
            if let Ok(map) = serde_json::from_str::<SeatMapResponse>(&cached) {
                return Ok(Json(map));
            }
            // Unparseable cache entries are dropped and re-seeded below.
            let _ = state.redis.invalidate_seat_map(&show_id).await;
        }
        Ok(None) => {}
        Err(e) => warn!(show_id = %show_id, error = %e, "seat map cache read failed"),
    }

    state
        .shows
        .get(show_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError(format!("show not found: {}", show_id)))?;

    let occupied = state
        .ledger
        .occupants(show_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let response = SeatMapResponse { show_id, occupied };
    if let Ok(payload) = serde_json::to_string(&response) {
        let ttl = state.business_rules.seat_cache_ttl_seconds;
        if let Err(e) = state.redis.set_seat_map(&show_id, &payload, ttl).await {
            warn!(show_id = %show_id, error = %e, "seat map cache write failed");
        }
    }

    Ok(Json(response))
}

/// Live seat activity for one show, fanned out from the broadcast channel
/// the booking and expiry paths publish on.
async fn stream_seat_activity(
    State(state): State<AppState>,
    Path(show_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let rx = state.sse_tx.subscribe();

    let stream = tokio_stream::wrappers::BroadcastStream::new(rx).filter_map(move |result| {
        async move {
            match result {
                Ok(event) if event.show_id == show_id => {
                    Some(Event::default().event("seat_activity").json_data(&event))
                }
                _ => None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
