//! Gateway webhook ingestion.
//!
//! The gateway delivers events at-least-once and out of order, so ingestion is built to be
//! replay-safe: the signature is verified over the exact raw body, the event is resolved to an
//! order, and the corresponding transition is applied through the same compare-and-swap choke
//! point as every other stimulus. A duplicate or superseded event acknowledges with `200` and no
//! mutation; only signature failures, malformed payloads and internal errors are rejected, the
//! last of which invites a gateway retry.

use std::sync::Arc;

use bzr_common::Secret;
use log::*;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    db_types::Order,
    helpers::verify_signature,
    order_flow::{OrderFlowApi, OrderFlowError},
    traits::MarketplaceDatabase,
};

/// Header carrying the hex-encoded HMAC-SHA256 of the raw request body.
pub const SIGNATURE_HEADER: &str = "x-gateway-signature";

#[derive(Debug, Clone, Error)]
pub enum WebhookError {
    /// The signature did not match the body. The delivery is rejected outright.
    #[error("Webhook signature verification failed")]
    InvalidSignature,
    #[error("Malformed webhook payload. {0}")]
    MalformedPayload(String),
    /// An internal failure while applying the event. Returned as a 5xx so the gateway retries.
    #[error("Could not apply webhook event. {0}")]
    Flow(#[from] OrderFlowError),
}

/// How a verified delivery was resolved. Every variant is acknowledged with `200`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAck {
    /// The event transitioned an order.
    Processed,
    /// The order was already at (or past) the event's target state. Nothing was mutated.
    Duplicate,
    /// A verified event type we do not act on.
    Ignored,
    /// The event references no order we know about. Acknowledged so the gateway stops
    /// retrying; flagged in the logs for reconciliation.
    UnknownOrder,
}

/// A parsed gateway event. The wire shape is the gateway's envelope:
/// `{"event": "...", "payload": {"payment"|"refund": {"entity": {...}}}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    PaymentCaptured { gateway_order_id: String, payment_id: String },
    PaymentFailed { gateway_order_id: String, payment_id: String },
    RefundProcessed { payment_id: String, refund_id: String },
    RefundFailed { payment_id: String, refund_id: String },
    Other(String),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    payload: EventPayload,
}

#[derive(Debug, Default, Deserialize)]
struct EventPayload {
    payment: Option<Wrapped<PaymentEntity>>,
    refund: Option<Wrapped<RefundEntity>>,
}

#[derive(Debug, Deserialize)]
struct Wrapped<T> {
    entity: T,
}

#[derive(Debug, Deserialize)]
struct PaymentEntity {
    id: String,
    order_id: String,
}

#[derive(Debug, Deserialize)]
struct RefundEntity {
    id: String,
    payment_id: String,
}

impl GatewayEvent {
    /// Parses a raw (already signature-verified) webhook body.
    pub fn parse(body: &[u8]) -> Result<Self, WebhookError> {
        let envelope: Envelope =
            serde_json::from_slice(body).map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
        let payment = |payload: EventPayload| {
            payload
                .payment
                .map(|p| (p.entity.order_id, p.entity.id))
                .ok_or_else(|| WebhookError::MalformedPayload("payment event without payment entity".into()))
        };
        let refund = |payload: EventPayload| {
            payload
                .refund
                .map(|r| (r.entity.payment_id, r.entity.id))
                .ok_or_else(|| WebhookError::MalformedPayload("refund event without refund entity".into()))
        };
        let event = match envelope.event.as_str() {
            "payment.captured" => {
                let (gateway_order_id, payment_id) = payment(envelope.payload)?;
                Self::PaymentCaptured { gateway_order_id, payment_id }
            },
            "payment.failed" => {
                let (gateway_order_id, payment_id) = payment(envelope.payload)?;
                Self::PaymentFailed { gateway_order_id, payment_id }
            },
            "refund.processed" => {
                let (payment_id, refund_id) = refund(envelope.payload)?;
                Self::RefundProcessed { payment_id, refund_id }
            },
            "refund.failed" => {
                let (payment_id, refund_id) = refund(envelope.payload)?;
                Self::RefundFailed { payment_id, refund_id }
            },
            other => Self::Other(other.to_string()),
        };
        Ok(event)
    }
}

/// Verifies, parses and applies webhook deliveries.
pub struct WebhookIngestor<B> {
    api: Arc<OrderFlowApi<B>>,
    secret: Secret<String>,
}

impl<B> WebhookIngestor<B>
where B: MarketplaceDatabase
{
    pub fn new(api: Arc<OrderFlowApi<B>>, secret: Secret<String>) -> Self {
        Self { api, secret }
    }

    /// The full ingestion path for one delivery: verify the signature over the exact bytes
    /// received, parse, resolve the order and apply the transition.
    pub async fn ingest(&self, body: &[u8], signature: &str) -> Result<WebhookAck, WebhookError> {
        if !verify_signature(self.secret.reveal(), body, signature) {
            warn!("🪝️ Webhook delivery with a bad signature rejected");
            return Err(WebhookError::InvalidSignature);
        }
        let event = GatewayEvent::parse(body)?;
        self.apply(event).await
    }

    /// Applies an already-verified event.
    pub async fn apply(&self, event: GatewayEvent) -> Result<WebhookAck, WebhookError> {
        match event {
            GatewayEvent::PaymentCaptured { gateway_order_id, payment_id } => {
                let Some(order) = self.order_by_gateway_id(&gateway_order_id).await? else {
                    return Ok(WebhookAck::UnknownOrder);
                };
                let applied = self.api.apply_payment_captured(&order, &payment_id).await?;
                Ok(Self::ack(applied, "payment.captured"))
            },
            GatewayEvent::PaymentFailed { gateway_order_id, .. } => {
                let Some(order) = self.order_by_gateway_id(&gateway_order_id).await? else {
                    return Ok(WebhookAck::UnknownOrder);
                };
                let applied = self.api.apply_payment_failed(&order).await?;
                Ok(Self::ack(applied, "payment.failed"))
            },
            GatewayEvent::RefundProcessed { payment_id, .. } => {
                let Some(order) = self.order_by_payment_id(&payment_id).await? else {
                    return Ok(WebhookAck::UnknownOrder);
                };
                let applied = self.api.apply_refund_processed(&order).await?;
                Ok(Self::ack(applied, "refund.processed"))
            },
            GatewayEvent::RefundFailed { payment_id, .. } => {
                let Some(order) = self.order_by_payment_id(&payment_id).await? else {
                    return Ok(WebhookAck::UnknownOrder);
                };
                let applied = self.api.apply_refund_failed(&order).await?;
                Ok(Self::ack(applied, "refund.failed"))
            },
            GatewayEvent::Other(event) => {
                info!("🪝️ Verified webhook event '{event}' has no handler; acknowledged");
                Ok(WebhookAck::Ignored)
            },
        }
    }

    fn ack(applied: Option<Order>, event: &str) -> WebhookAck {
        match applied {
            Some(order) => {
                info!("🪝️ Webhook event {event} applied to order {}", order.id);
                WebhookAck::Processed
            },
            None => WebhookAck::Duplicate,
        }
    }

    async fn order_by_gateway_id(&self, gateway_order_id: &str) -> Result<Option<Order>, WebhookError> {
        let order = self
            .api
            .db()
            .fetch_order_by_gateway_order_id(gateway_order_id)
            .await
            .map_err(OrderFlowError::db)?;
        if order.is_none() {
            warn!("🪝️ Webhook references unknown gateway order {gateway_order_id}; acknowledged and flagged");
        }
        Ok(order)
    }

    async fn order_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, WebhookError> {
        let order = self.api.db().fetch_order_by_payment_id(payment_id).await.map_err(OrderFlowError::db)?;
        if order.is_none() {
            warn!("🪝️ Webhook references unknown payment {payment_id}; acknowledged and flagged");
        }
        Ok(order)
    }
}
