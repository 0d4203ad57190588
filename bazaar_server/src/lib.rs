//! # Marketplace order server
//!
//! The HTTP surface over the order lifecycle engine. It is responsible for:
//! * exposing the buyer/seller/admin order actions as REST endpoints,
//! * receiving and verifying payment gateway webhook deliveries,
//! * running the background sweepers that expire unpaid orders and settle aged ones.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more
//! information.
//!
//! ## Trust boundary
//! Authentication happens upstream; the server trusts the `x-actor-id` / `x-actor-role` headers
//! injected by the proxy in front of it. Webhook deliveries carry their own HMAC signature and
//! are verified here.

pub mod actor;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod routes;
pub mod server;
pub mod sweepers;

#[cfg(test)]
mod endpoint_tests;
