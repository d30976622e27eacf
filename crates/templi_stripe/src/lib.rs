// --- File: crates/templi_stripe/src/lib.rs ---

pub mod circuit_breaker;
pub mod doc;
pub mod error;
pub mod handlers;
pub mod idempotency;
pub mod logic;
pub mod routes;
pub mod service;
pub mod webhook;

// Re-export for main backend
pub use circuit_breaker::{CallPermit, CircuitBreaker, CircuitState};
pub use error::StripeError;
pub use handlers::StripeState;
pub use idempotency::ProcessedEvents;
pub use logic::{
    CheckSubscriptionRequest, CreateCheckoutRequest, CreateCheckoutResponse, DynBillingProvider,
    Plan, SubscriptionStatusResult,
};
pub use routes::routes;
pub use service::StripeBillingService;
pub use webhook::{sign_payload, SIGNATURE_HEADER};
