//! services/web/src/adapters/webhook.rs
//!
//! Acknowledges checkout events from the payment processor. Signature
//! verification and booking creation belong to the payment integration; this
//! adapter only checks the payload is an event and records it.

use async_trait::async_trait;
use serde::Deserialize;
use tour_booking_core::ports::{PaymentWebhookService, PortError, PortResult};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct CheckoutEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct LoggingWebhookAdapter;

impl LoggingWebhookAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentWebhookService for LoggingWebhookAdapter {
    async fn handle_checkout_event(&self, signature: Option<&str>, payload: &[u8]) -> PortResult<()> {
        if signature.is_none() {
            warn!("Checkout webhook arrived without a signature header");
        }
        let event: CheckoutEvent = serde_json::from_slice(payload)
            .map_err(|e| PortError::Validation(vec![format!("Malformed event payload: {}", e)]))?;

        info!(
            event_type = %event.kind,
            event_id = event.id.as_deref().unwrap_or("-"),
            bytes = payload.len(),
            "Received checkout webhook"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepts_events_and_rejects_garbage() {
        let adapter = LoggingWebhookAdapter::new();
        let event = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        assert!(adapter.handle_checkout_event(Some("t=1,v1=abc"), event).await.is_ok());

        let err = adapter
            .handle_checkout_event(Some("t=1,v1=abc"), b"not json")
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
    }
}
