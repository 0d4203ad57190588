use bzr_common::MinorUnits;
use thiserror::Error;

use crate::{
    db_types::OrderId,
    traits::{PaymentIntent, RefundReceipt},
};

/// Outbound contract to the payment gateway.
///
/// Calls are synchronous from the caller's perspective and carry no automatic retry. A failed
/// call surfaces as an error the caller reports without mutating persisted state; the gateway's
/// eventual webhook is the authoritative, idempotent second path to the same terminal state.
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayClient {
    /// Creates a payment intent for the order. Only called for `Accepted` orders with a positive
    /// amount.
    async fn create_intent(
        &self,
        order_id: &OrderId,
        amount: MinorUnits,
        currency: &str,
    ) -> Result<PaymentIntent, GatewayClientError>;

    /// Issues a refund for a captured payment. May fail or time out; the engine never retries.
    async fn refund(
        &self,
        payment_id: &str,
        amount: MinorUnits,
        reason: &str,
    ) -> Result<RefundReceipt, GatewayClientError>;
}

#[derive(Debug, Clone, Error)]
pub enum GatewayClientError {
    #[error("Could not reach the payment gateway. {0}")]
    Transport(String),
    #[error("The payment gateway rejected the request. {0}")]
    Rejected(String),
}
