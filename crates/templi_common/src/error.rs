// --- File: crates/templi_common/src/error.rs ---
use std::fmt;
use thiserror::Error;

/// The base error type for everything the server reports to a caller.
///
/// Feature crates keep their own error enums and convert into this one at the
/// handler boundary via `From<SpecificError> for TempliError`.
#[derive(Error, Debug)]
pub enum TempliError {
    /// A required field is missing or a request body could not be read.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The payment provider failed or rejected the call. The message is the
    /// provider's own and is passed to the caller unchanged.
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// A webhook failed signature verification.
    #[error("Webhook authentication error: {0}")]
    WebhookAuthError(String),

    /// No route or resource matched.
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// Missing or invalid server configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Anything else that went wrong on our side.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl TempliError {
    /// The message exposed in the `{"error": ...}` response body.
    ///
    /// `Display` carries a category prefix for logs; callers only see the bare message.
    pub fn client_message(&self) -> &str {
        match self {
            TempliError::ValidationError(msg)
            | TempliError::ProviderError(msg)
            | TempliError::WebhookAuthError(msg)
            | TempliError::NotFoundError(msg)
            | TempliError::ConfigError(msg)
            | TempliError::InternalError(msg) => msg,
        }
    }
}

/// A trait for converting errors to HTTP status codes.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for TempliError {
    fn status_code(&self) -> u16 {
        match self {
            TempliError::ValidationError(_) => 400,
            TempliError::ProviderError(_) => 500,
            TempliError::WebhookAuthError(_) => 400,
            TempliError::NotFoundError(_) => 404,
            TempliError::ConfigError(_) => 500,
            TempliError::InternalError(_) => 500,
        }
    }
}

/// Shorthand for a 404.
pub fn not_found<T: fmt::Display>(message: T) -> TempliError {
    TempliError::NotFoundError(message.to_string())
}
