//! Bazaar Payment & Order Engine
//!
//! The engine is the single authority over the order lifecycle in the Bazaar marketplace. A
//! transacted item moves through a multi-party lifecycle: a buyer places an order, the seller
//! accepts or rejects it, a payment is collected through an external gateway, and the order
//! eventually completes, is cancelled, or expires.
//!
//! State-changing signals arrive from three independent, asynchronous sources:
//! 1. Synchronous user actions relayed by the HTTP server,
//! 2. Payment-gateway webhook deliveries, which may arrive late, out of order, or duplicated,
//! 3. Periodic background sweepers that drive time-based transitions.
//!
//! All three funnel through [`OrderFlowApi`], which enforces the transition graph, the actor and
//! quota guards, and the compare-and-swap persistence discipline that makes every transition
//! either fully applied or a safe no-op under races.
//!
//! The library is divided into:
//! 1. Database management (`db`). SQLite is the supported backend. You should never need to
//!    access the database directly; use the public API instead. The exception is the data types,
//!    which are defined in [`db_types`] and are public.
//! 2. The engine public API: [`OrderFlowApi`] for lifecycle transitions, [`WebhookIngestor`] for
//!    gateway event ingestion, and the notification channel in [`events`].
//!
//! The engine emits a [`events::Notification`] after every committed transition. Notifications are
//! fire-and-forget; a dropped notification never rolls back a transition.
mod db;

pub mod db_types;
pub mod events;
pub mod helpers;
mod order_flow;
pub mod test_utils;
pub mod traits;
mod webhook;

pub use db::sqlite::SqliteDatabase;
pub use order_flow::{actions, OrderFlowApi, OrderFlowError, PolicyLimits, SellerDecision, SweepOutcome};
pub use traits::{MarketplaceDatabase, PaymentGatewayClient};
pub use webhook::{GatewayEvent, WebhookAck, WebhookError, WebhookIngestor, SIGNATURE_HEADER};
