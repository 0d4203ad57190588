//! Contracts between the engine and its collaborators.
//!
//! * [`MarketplaceDatabase`] is the persistence boundary. Its defining feature is the pair of
//!   compare-and-swap write primitives ([`MarketplaceDatabase::checked_status_update`] and
//!   [`MarketplaceDatabase::checked_payment_update`]): a write only applies if the record is
//!   still in the state the caller read, which is how concurrent writers (user actions, webhook
//!   deliveries, sweeper ticks) are serialised without any cross-order locking.
//! * [`PaymentGatewayClient`] is the outbound contract to the payment gateway. The engine never
//!   talks to the gateway's network surface directly, which keeps every flow deterministic under
//!   test with a fake implementation.
mod data_objects;
mod marketplace_database;
mod payment_gateway;

pub use data_objects::{OrderUpdate, PaymentIntent, PaymentUpdate, RefundReceipt};
pub use marketplace_database::MarketplaceDatabase;
pub use payment_gateway::{GatewayClientError, PaymentGatewayClient};
