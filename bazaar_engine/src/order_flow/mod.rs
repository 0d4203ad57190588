mod api;
mod errors;

pub use api::{actions, OrderFlowApi, PolicyLimits, SellerDecision, SweepOutcome};
pub use errors::OrderFlowError;
