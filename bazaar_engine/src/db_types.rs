use std::{fmt::Display, str::FromStr};

use bzr_common::{MinorUnits, DEFAULT_CURRENCY_CODE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {0}: {1}")]
pub struct ConversionError(pub &'static str, pub String);

//--------------------------------------      OrderId       ----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// Generates a fresh random order id. Ids are opaque strings; nothing in the engine depends on
    /// their structure.
    pub fn random() -> Self {
        let suffix: u64 = rand::random();
        Self(format!("ord_{suffix:016x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------    OrderStatus     ----------------------------------------------------------
/// The lifecycle status of an order.
///
/// The status only ever moves forward along a fixed directed graph:
///
/// ```text
/// Pending  -> Accepted | Rejected | Cancelled | Expired
/// Accepted -> Completed
/// ```
///
/// `Rejected`, `Cancelled`, `Completed` and `Expired` are terminal. The legality of an edge is
/// checked with [`OrderStatus::can_become`]; the engine additionally re-checks the source status
/// at write time, so an illegal or stale transition can never be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Newly placed by the buyer; awaiting the seller's decision.
    Pending,
    /// The seller accepted the order. Payment collection happens in this state.
    Accepted,
    /// The seller turned the order down.
    Rejected,
    /// The buyer or seller cancelled the order while it was still pending.
    Cancelled,
    /// The order ran to completion (automatically, 7 days after acceptance).
    Completed,
    /// The order was abandoned: payment was still pending when the payment window closed.
    Expired,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled | Self::Completed | Self::Expired)
    }

    /// Whether `self -> next` is an edge of the transition graph.
    pub fn can_become(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match self {
            Pending => matches!(next, Accepted | Rejected | Cancelled | Expired),
            Accepted => matches!(next, Completed),
            Rejected | Cancelled | Completed | Expired => false,
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Accepted => "Accepted",
            OrderStatus::Rejected => "Rejected",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Completed => "Completed",
            OrderStatus::Expired => "Expired",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Accepted" => Ok(Self::Accepted),
            "Rejected" => Ok(Self::Rejected),
            "Cancelled" => Ok(Self::Cancelled),
            "Completed" => Ok(Self::Completed),
            "Expired" => Ok(Self::Expired),
            s => Err(ConversionError("order status", s.to_string())),
        }
    }
}

//--------------------------------------   PaymentStatus    ----------------------------------------------------------
/// The payment sub-state of an order. Advances independently of [`OrderStatus`] along its own
/// graph:
///
/// ```text
/// Pending -> Paid -> Refunded
/// Pending -> Failed
/// Pending -> Expired
/// Paid    -> RefundFailed
/// ```
///
/// `RefundFailed` requires manual admin intervention; the engine never retries a refund on its
/// own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
    RefundFailed,
    Expired,
}

impl PaymentStatus {
    pub fn can_become(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        match self {
            Pending => matches!(next, Paid | Failed | Expired),
            Paid => matches!(next, Refunded | RefundFailed),
            Failed | Refunded | RefundFailed | Expired => false,
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::RefundFailed => "refund_failed",
            PaymentStatus::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            "refund_failed" => Ok(Self::RefundFailed),
            "expired" => Ok(Self::Expired),
            s => Err(ConversionError("payment status", s.to_string())),
        }
    }
}

//--------------------------------------       Actor        ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Buyer,
    Seller,
    Admin,
    /// Automated actors: the sweepers and the webhook ingestor.
    System,
}

impl Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActorRole::Buyer => "buyer",
            ActorRole::Seller => "seller",
            ActorRole::Admin => "admin",
            ActorRole::System => "system",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ActorRole {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            "admin" => Ok(Self::Admin),
            "system" => Ok(Self::System),
            s => Err(ConversionError("actor role", s.to_string())),
        }
    }
}

/// The already-authenticated identity on whose behalf a transition runs. Authentication itself
/// happens upstream; the engine only checks that the actor is a legal participant for the
/// requested transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn new<S: Into<String>>(id: S, role: ActorRole) -> Self {
        Self { id: id.into(), role }
    }

    /// The identity recorded for automated transitions (sweepers, webhook ingestion).
    pub fn system() -> Self {
        Self { id: "system".to_string(), role: ActorRole::System }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }
}

impl Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id, self.role)
    }
}

//--------------------------------------    PaymentInfo     ----------------------------------------------------------
/// The payment sub-entity of an order. Stored as flattened columns on the orders row; grouped
/// here so callers see one coherent object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInfo {
    /// The order id assigned by the payment gateway when an intent is created.
    pub gateway_order_id: Option<String>,
    /// The gateway's payment id, known once a capture is reported.
    pub payment_id: Option<String>,
    /// The signature the client presented when verifying the payment.
    pub signature: Option<String>,
    pub status: PaymentStatus,
    /// True once the payment signature has been verified against the gateway secret.
    pub verified: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub refund_reason: Option<String>,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        Self::Pending
    }
}

//--------------------------------------       Order        ----------------------------------------------------------
/// The aggregate root: a single buyer–seller transaction for one product.
///
/// Identity and parties are immutable after creation, as is `amount`. Everything else changes
/// only through named transitions in the order flow API, and `accepted_at` / `completed_at` /
/// `expiry_reason` are each set exactly once by the transition that produces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub product_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub status: OrderStatus,
    pub amount: MinorUnits,
    pub currency: String,
    pub payment: PaymentInfo,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expiry_reason: Option<String>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Whether the given actor is a party to this order.
    pub fn is_participant(&self, actor: &Actor) -> bool {
        self.buyer_id == actor.id || self.seller_id == actor.id
    }
}

//--------------------------------------      NewOrder      ----------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub id: OrderId,
    pub product_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub amount: MinorUnits,
    pub currency: String,
}

impl NewOrder {
    pub fn new<S: Into<String>>(product_id: S, buyer_id: S, seller_id: S, amount: MinorUnits) -> Self {
        Self {
            id: OrderId::random(),
            product_id: product_id.into(),
            buyer_id: buyer_id.into(),
            seller_id: seller_id.into(),
            amount,
            currency: DEFAULT_CURRENCY_CODE.to_string(),
        }
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }
}

//--------------------------------------  ActivityLogEntry  ----------------------------------------------------------
/// One append-only audit row per accepted transition. Never mutated or deleted; hard-deleting an
/// order leaves its activity trail intact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: i64,
    pub order_id: OrderId,
    /// `"system"` for automated actors.
    pub actor_id: String,
    pub action: String,
    pub remarks: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      Product       ----------------------------------------------------------
/// The minimal slice of the product catalog the engine touches: expiring an order releases its
/// product back to an orderable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ProductStatus {
    Available,
    Ordered,
}

impl Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProductStatus::Available => "available",
            ProductStatus::Ordered => "ordered",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ProductStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "ordered" => Ok(Self::Ordered),
            s => Err(ConversionError("product status", s.to_string())),
        }
    }
}
