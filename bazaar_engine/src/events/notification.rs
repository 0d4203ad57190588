use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db_types::Order;

/// The audience id for the admin channel, alongside per-user audiences named by buyer/seller id.
pub const ADMIN_AUDIENCE: &str = "admin";

/// A best-effort realtime notification to one audience (a buyer, a seller, or the admin channel).
///
/// Notifications are emitted strictly after the persistence commit of the transition that caused
/// them, exactly once per committed transition. Delivery is fire-and-forget: a failure is logged
/// and never rolls back or blocks the transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub audience: String,
    pub event: String,
    pub payload: Value,
}

impl Notification {
    pub fn new<A: Into<String>, E: Into<String>>(audience: A, event: E, payload: Value) -> Self {
        Self { audience: audience.into(), event: event.into(), payload }
    }

    /// The standard payload for order events: enough for a client to re-render without another
    /// round trip.
    pub fn order_payload(order: &Order) -> Value {
        serde_json::json!({
            "order_id": order.id.as_str(),
            "product_id": order.product_id,
            "status": order.status,
            "payment_status": order.payment.status,
            "amount": order.amount,
        })
    }
}
