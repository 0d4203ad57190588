use bzr_common::MinorUnits;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{OrderStatus, PaymentStatus};

/// The order-level fields a single transition is allowed to change. Identity, parties and amount
/// are deliberately absent; they are immutable after creation.
#[derive(Debug, Clone, Default)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expiry_reason: Option<String>,
    /// Some transitions (expiry) advance the payment sub-state in the same atomic write.
    pub payment_status: Option<PaymentStatus>,
}

impl OrderUpdate {
    pub fn status(status: OrderStatus) -> Self {
        Self { status: Some(status), ..Default::default() }
    }

    pub fn with_accepted_at(mut self, at: DateTime<Utc>) -> Self {
        self.accepted_at = Some(at);
        self
    }

    pub fn with_completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }

    pub fn with_expiry_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.expiry_reason = Some(reason.into());
        self
    }

    pub fn with_payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }
}

/// The payment-level fields a single reconciliation step is allowed to change.
#[derive(Debug, Clone, Default)]
pub struct PaymentUpdate {
    pub status: Option<PaymentStatus>,
    pub gateway_order_id: Option<String>,
    pub payment_id: Option<String>,
    pub signature: Option<String>,
    pub verified: Option<bool>,
    pub paid_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub refund_reason: Option<String>,
}

impl PaymentUpdate {
    pub fn status(status: PaymentStatus) -> Self {
        Self { status: Some(status), ..Default::default() }
    }

    pub fn with_gateway_order_id<S: Into<String>>(mut self, id: S) -> Self {
        self.gateway_order_id = Some(id.into());
        self
    }

    pub fn with_payment_id<S: Into<String>>(mut self, id: S) -> Self {
        self.payment_id = Some(id.into());
        self
    }

    pub fn with_signature<S: Into<String>>(mut self, signature: S) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_verified(mut self, verified: bool) -> Self {
        self.verified = Some(verified);
        self
    }

    pub fn with_paid_at(mut self, at: DateTime<Utc>) -> Self {
        self.paid_at = Some(at);
        self
    }

    pub fn with_refunded_at(mut self, at: DateTime<Utc>) -> Self {
        self.refunded_at = Some(at);
        self
    }

    pub fn with_refund_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.refund_reason = Some(reason.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.gateway_order_id.is_none()
            && self.payment_id.is_none()
            && self.signature.is_none()
            && self.verified.is_none()
            && self.paid_at.is_none()
            && self.refunded_at.is_none()
            && self.refund_reason.is_none()
    }
}

/// A payment intent created at the gateway for an accepted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub gateway_order_id: String,
    pub amount: MinorUnits,
    pub currency: String,
}

/// The gateway's acknowledgement of a synchronously issued refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundReceipt {
    pub refund_id: String,
}
