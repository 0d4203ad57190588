//! Glue between the engine's gateway port and the live REST client.

use bazaar_engine::{
    db_types::OrderId,
    traits::{GatewayClientError, PaymentGatewayClient, PaymentIntent, RefundReceipt},
};
use bzr_common::MinorUnits;
use gateway_tools::{GatewayApi, GatewayApiError, GatewayConfig, NewGatewayOrder, NewRefund};

use crate::errors::ServerError;

/// [`GatewayApi`] wrapped into the engine's [`PaymentGatewayClient`] port.
#[derive(Clone)]
pub struct LiveGateway {
    api: GatewayApi,
}

impl LiveGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, ServerError> {
        let api = GatewayApi::new(config).map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Self { api })
    }
}

fn map_err(e: GatewayApiError) -> GatewayClientError {
    if e.is_rejection() {
        GatewayClientError::Rejected(e.to_string())
    } else {
        GatewayClientError::Transport(e.to_string())
    }
}

impl PaymentGatewayClient for LiveGateway {
    async fn create_intent(
        &self,
        order_id: &OrderId,
        amount: MinorUnits,
        currency: &str,
    ) -> Result<PaymentIntent, GatewayClientError> {
        let new_order =
            NewGatewayOrder { amount, currency: currency.to_string(), receipt: order_id.as_str().to_string() };
        let order = self.api.create_order(new_order).await.map_err(map_err)?;
        Ok(PaymentIntent { gateway_order_id: order.id, amount: order.amount, currency: order.currency })
    }

    async fn refund(
        &self,
        payment_id: &str,
        amount: MinorUnits,
        reason: &str,
    ) -> Result<RefundReceipt, GatewayClientError> {
        let refund = NewRefund { amount, notes: Some(serde_json::json!({ "reason": reason })) };
        let refund = self.api.create_refund(payment_id, refund).await.map_err(map_err)?;
        Ok(RefundReceipt { refund_id: refund.id })
    }
}
