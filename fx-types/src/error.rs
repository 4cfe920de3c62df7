//! Error types for the currency rates service.

use std::collections::BTreeMap;

/// Core errors raised by providers, the provider factory and the cached
/// rate service.
///
/// The cache hands the same failure to every caller waiting on a key, so
/// the type is `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RatesError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No currency providers are registered")]
    NoProvidersRegistered,

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Malformed upstream response: {0}")]
    UpstreamMalformedResponse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RatesError {
    /// Shorthand for a missing required parameter.
    pub fn missing(name: &str) -> Self {
        RatesError::InvalidArgument(format!("{} is required", name))
    }
}

/// Field name -> validation messages, in a stable order.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("One or more validation errors occurred")]
    Validation(FieldErrors),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("External service error: {0}")]
    ServiceUnavailable(String),

    #[error("Bad gateway: {0}")]
    BadGateway(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RatesError> for AppError {
    fn from(err: RatesError) -> Self {
        match err {
            RatesError::InvalidArgument(msg) => AppError::BadRequest(msg),
            RatesError::UpstreamUnavailable(msg) => AppError::ServiceUnavailable(msg),
            RatesError::UpstreamMalformedResponse(msg) => AppError::BadGateway(msg),
            RatesError::NoProvidersRegistered => {
                AppError::Internal("No currency providers are registered".into())
            }
            RatesError::Internal(msg) => AppError::Internal(msg),
        }
    }
}
