use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use bazaar_engine::{OrderFlowError, WebhookError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("Caller identity is missing or malformed. {0}")]
    InvalidIdentity(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error(transparent)]
    OrderFlow(#[from] OrderFlowError),
    #[error(transparent)]
    Webhook(#[from] WebhookError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InvalidIdentity(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::OrderFlow(e) => match e {
                OrderFlowError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                OrderFlowError::SignatureMismatch => StatusCode::BAD_REQUEST,
                OrderFlowError::OrderNotFound(_) => StatusCode::NOT_FOUND,
                OrderFlowError::Forbidden(_) => StatusCode::FORBIDDEN,
                OrderFlowError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
                OrderFlowError::IllegalTransition { .. } => StatusCode::CONFLICT,
                OrderFlowError::IllegalPaymentTransition { .. } => StatusCode::CONFLICT,
                OrderFlowError::StaleTransition(_) => StatusCode::CONFLICT,
                OrderFlowError::OrderDeleted(_) => StatusCode::CONFLICT,
                OrderFlowError::PaymentNotRefundable(_) => StatusCode::CONFLICT,
                OrderFlowError::GatewayError(_) => StatusCode::BAD_GATEWAY,
                OrderFlowError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            // Anything else went wrong on our side; a 5xx invites the gateway to redeliver.
            Self::Webhook(e) => match e {
                WebhookError::InvalidSignature => StatusCode::BAD_REQUEST,
                WebhookError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
                WebhookError::Flow(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}
