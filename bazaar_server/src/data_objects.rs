use std::fmt::Display;

use bzr_common::MinorUnits;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderRequest {
    pub product_id: String,
    pub seller_id: String,
    pub amount: MinorUnits,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SellerResponseRequest {
    /// "accept" or "reject".
    pub decision: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReasonRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyPaymentRequest {
    pub payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SweeperToggleRequest {
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteParams {
    /// `?hard=true` removes the row outright instead of soft-deleting it.
    #[serde(default)]
    pub hard: bool,
}
