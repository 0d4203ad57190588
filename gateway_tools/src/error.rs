use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

impl GatewayApiError {
    /// Whether the gateway rejected the request, as opposed to the request not arriving at all.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::QueryError { .. })
    }
}
