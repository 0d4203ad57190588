use thiserror::Error;

use crate::db_types::{OrderId, OrderStatus, PaymentStatus};

/// Everything that can go wrong while driving an order through the lifecycle.
///
/// The variants are deliberately distinct per failure class so callers (the HTTP layer in
/// particular) can map each to its own response code instead of pattern-matching on message
/// strings.
#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Invalid input. {0}")]
    InvalidInput(String),
    #[error("Order {0} not found")]
    OrderNotFound(OrderId),
    #[error("Actor is not permitted to perform this action. {0}")]
    Forbidden(String),
    #[error("Rate limit exceeded: at most {limit} {scope}")]
    RateLimitExceeded { scope: &'static str, limit: u32 },
    #[error("Illegal transition from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },
    #[error("Illegal payment transition from {from} to {to}")]
    IllegalPaymentTransition { from: PaymentStatus, to: PaymentStatus },
    /// The order left the expected state between the guard check and the write. The caller's
    /// view was stale; nothing was mutated.
    #[error("Order {0} changed concurrently; transition not applied")]
    StaleTransition(OrderId),
    #[error("Order {0} is deleted; only restore is permitted")]
    OrderDeleted(OrderId),
    #[error("Payment signature verification failed")]
    SignatureMismatch,
    #[error("Payment is not refundable from status {0}")]
    PaymentNotRefundable(PaymentStatus),
    #[error("Payment gateway call failed. {0}")]
    GatewayError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl OrderFlowError {
    pub(crate) fn db<E: std::error::Error>(e: E) -> Self {
        Self::DatabaseError(e.to_string())
    }
}
