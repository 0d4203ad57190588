use bzr_common::MinorUnits;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request body for creating a gateway order. `receipt` is the marketplace's own order id; the
/// gateway echoes it back on every related object.
#[derive(Debug, Clone, Serialize)]
pub struct NewGatewayOrder {
    pub amount: MinorUnits,
    pub currency: String,
    pub receipt: String,
}

/// A gateway order, the object a client checkout session is opened against.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: MinorUnits,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    pub order_id: String,
    pub amount: MinorUnits,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewRefund {
    pub amount: MinorUnits,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayRefund {
    pub id: String,
    pub payment_id: String,
    pub amount: MinorUnits,
    pub status: String,
}
