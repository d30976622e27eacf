// --- File: crates/templi_common/src/lib.rs ---

pub mod error; // Error handling
pub mod handlers; // Shared HTTP handlers (health)
pub mod http; // HTTP utilities
pub mod logging; // Logging utilities
pub mod models; // Shared response types
pub mod routes; // Shared routes
pub mod services; // Provider abstraction

// Re-export the routes function to be used by the backend service
pub use routes::routes;

// Re-export error types and utilities for easier access
pub use error::{not_found, HttpStatusCode, TempliError};

// Re-export HTTP utilities for easier access
pub use http::{
    client::create_client,
    IntoHttpResponse, JsonBody,
};
