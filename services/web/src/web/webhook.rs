//! services/web/src/web/webhook.rs
//!
//! Payment processor callback. The route sits outside the body-parsing
//! stages, so `body` holds exactly what arrived on the wire. Failures are
//! answered in JSON like the API, never with an HTML page.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tour_booking_core::ports::PortError;
use tracing::warn;

use crate::web::{error::AppError, state::AppState};

pub const WEBHOOK_PATH: &str = "/webhook-checkout";
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// `POST /webhook-checkout`
pub async fn webhook_checkout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());

    state
        .webhook
        .handle_checkout_event(signature, &body)
        .await
        .map_err(|e| match e {
            PortError::Unexpected(msg) => AppError::Internal(msg),
            other => {
                warn!("Rejected checkout webhook: {}", other);
                AppError::BadRequest(format!("Webhook error: {}", other))
            }
        })?;

    Ok(Json(json!({ "received": true })))
}
