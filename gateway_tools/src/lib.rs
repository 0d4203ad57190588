//! A thin client for the payment gateway's REST API.
//!
//! This crate knows nothing about marketplace orders; it speaks the gateway's own dialect
//! (orders, payments, refunds, all amounts in minor units) and leaves mapping those onto the
//! marketplace's lifecycle to the caller.

mod api;
mod config;
mod data_objects;
mod error;

pub use api::GatewayApi;
pub use config::GatewayConfig;
pub use data_objects::{GatewayOrder, GatewayPayment, GatewayRefund, NewGatewayOrder, NewRefund};
pub use error::GatewayApiError;
