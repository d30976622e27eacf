// --- File: crates/templi_stripe/src/error.rs ---
use templi_common::{HttpStatusCode, TempliError};
use thiserror::Error;

/// Stripe-specific error types.
#[derive(Error, Debug)]
pub enum StripeError {
    /// Error occurred during a Stripe API request (network, timeout, TLS)
    #[error("Stripe API request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Error returned by the Stripe API
    #[error("Stripe API returned an error: {message} (Status: {status_code})")]
    ApiError { status_code: u16, message: String },

    /// The caller's request is missing something required
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Error parsing Stripe API response
    #[error("Failed to parse Stripe API response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Missing or incomplete Stripe configuration
    #[error("Stripe configuration missing or incomplete: {0}")]
    ConfigError(String),

    /// Calls are short-circuited after repeated provider failures
    #[error("Payment provider temporarily unavailable")]
    CircuitOpen,

    /// Stripe answered a checkout request without a hosted URL
    #[error("Stripe response missing checkout URL")]
    MissingCheckoutUrl,

    /// Webhook signature verification failed
    #[error("Stripe webhook signature verification failed: {0}")]
    WebhookSignatureError(String),

    /// Verified webhook body is not a Stripe event
    #[error("Invalid webhook payload: {0}")]
    WebhookPayloadError(String),

    /// Webhook event processing error
    #[error("Stripe webhook event processing error: {0}")]
    WebhookProcessingError(String),
}

impl StripeError {
    /// Whether this failure says something about the provider's health.
    ///
    /// Client-side rejections (bad price id, bad key) do not.
    pub fn is_provider_failure(&self) -> bool {
        match self {
            StripeError::RequestError(_) | StripeError::ParseError(_) => true,
            StripeError::ApiError { status_code, .. } => *status_code >= 500 || *status_code == 429,
            _ => false,
        }
    }
}

/// Convert StripeError to TempliError
impl From<StripeError> for TempliError {
    fn from(err: StripeError) -> Self {
        match err {
            // The provider's own message goes to the caller verbatim.
            StripeError::ApiError { message, .. } => TempliError::ProviderError(message),
            StripeError::RequestError(e) => TempliError::ProviderError(e.to_string()),
            StripeError::ParseError(e) => {
                TempliError::ProviderError(format!("Failed to parse Stripe response: {}", e))
            }
            StripeError::CircuitOpen => {
                TempliError::ProviderError("Payment provider temporarily unavailable".to_string())
            }
            StripeError::MissingCheckoutUrl => {
                TempliError::ProviderError("Stripe response missing checkout URL".to_string())
            }
            StripeError::InvalidRequest(msg) => TempliError::ValidationError(msg),
            StripeError::ConfigError(msg) => TempliError::ConfigError(msg),
            StripeError::WebhookSignatureError(msg) => {
                TempliError::WebhookAuthError(format!("Webhook Error: {}", msg))
            }
            StripeError::WebhookPayloadError(msg) => TempliError::ValidationError(msg),
            StripeError::WebhookProcessingError(msg) => TempliError::InternalError(msg),
        }
    }
}

/// Implement HttpStatusCode for StripeError to provide a consistent way to convert
/// StripeError to HTTP status codes.
impl HttpStatusCode for StripeError {
    fn status_code(&self) -> u16 {
        match self {
            StripeError::RequestError(_) => 500,
            StripeError::ApiError { .. } => 500,
            StripeError::InvalidRequest(_) => 400,
            StripeError::ParseError(_) => 500,
            StripeError::ConfigError(_) => 500,
            StripeError::CircuitOpen => 500,
            StripeError::MissingCheckoutUrl => 500,
            StripeError::WebhookSignatureError(_) => 400,
            StripeError::WebhookPayloadError(_) => 400,
            StripeError::WebhookProcessingError(_) => 500,
        }
    }
}
