//! # Marketplace Error Types
//!
//! Typed error handling for the dreamcars marketplace.
//! All store, token and payment operations return `Result<T, MarketError>`.

use thiserror::Error;

/// Core error type for all marketplace operations
#[derive(Debug, Error)]
pub enum MarketError {
    /// No credential supplied
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Credential present but invalid, or the identity lacks the required role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Document store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Token signing failure
    #[error("Token error: {0}")]
    Token(String),

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with provider
    #[error("Network error: {0}")]
    NetworkError(String),
}

impl MarketError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        MarketError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            MarketError::Unauthenticated(_) => 401,
            MarketError::Forbidden(_) => 403,
            MarketError::NotFound { .. } => 404,
            MarketError::InvalidRequest(_) => 400,
            MarketError::Configuration(_) => 500,
            MarketError::Store(_) => 500,
            MarketError::Serialization(_) => 500,
            MarketError::Token(_) => 500,
            MarketError::ProviderError { .. } => 502,
            MarketError::NetworkError(_) => 503,
        }
    }
}

impl From<serde_json::Error> for MarketError {
    fn from(err: serde_json::Error) -> Self {
        MarketError::Serialization(err.to_string())
    }
}

/// Result type alias for marketplace operations
pub type MarketResult<T> = Result<T, MarketError>;
