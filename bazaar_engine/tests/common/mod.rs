#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use bazaar_engine::{
    db_types::OrderId,
    events::{Notification, NotificationProducer, NotificationProducers},
    traits::{GatewayClientError, PaymentGatewayClient, PaymentIntent, RefundReceipt},
    OrderFlowApi, PolicyLimits, SqliteDatabase,
};
use bzr_common::MinorUnits;
use tokio::sync::mpsc;

/// A scripted gateway that records every call it receives.
#[derive(Clone, Default)]
pub struct FakeGateway {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail_refunds: bool,
}

impl FakeGateway {
    pub fn failing_refunds() -> Self {
        Self { fail_refunds: true, ..Default::default() }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl PaymentGatewayClient for FakeGateway {
    async fn create_intent(
        &self,
        order_id: &OrderId,
        amount: MinorUnits,
        currency: &str,
    ) -> Result<PaymentIntent, GatewayClientError> {
        self.calls.lock().unwrap().push(format!("create_intent {order_id}"));
        Ok(PaymentIntent { gateway_order_id: format!("gwo_{}", order_id.as_str()), amount, currency: currency.into() })
    }

    async fn refund(
        &self,
        payment_id: &str,
        _amount: MinorUnits,
        _reason: &str,
    ) -> Result<RefundReceipt, GatewayClientError> {
        self.calls.lock().unwrap().push(format!("refund {payment_id}"));
        if self.fail_refunds {
            return Err(GatewayClientError::Transport("connection reset by gateway".into()));
        }
        Ok(RefundReceipt { refund_id: format!("rfnd_{payment_id}") })
    }
}

/// An API over a fresh in-memory database, with a receiver observing every published
/// notification.
pub async fn observed_api() -> (OrderFlowApi<SqliteDatabase>, mpsc::Receiver<Notification>) {
    let _ = env_logger::try_init();
    let db = bazaar_engine::test_utils::memory_db().await;
    let (producer, receiver) = NotificationProducer::pair(64);
    let mut producers = NotificationProducers::default();
    producers.attach(producer);
    (OrderFlowApi::new(db, producers, PolicyLimits::default()), receiver)
}

pub fn drain(receiver: &mut mpsc::Receiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = receiver.try_recv() {
        out.push(n);
    }
    out
}
