// --- File: crates/templi_common/src/routes.rs ---

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::handlers::{health_handler, CommonState};

/// Creates a router with the routes shared by every deployment (`/health`).
pub fn routes(service_name: impl Into<String>) -> Router {
    let state = Arc::new(CommonState {
        service_name: service_name.into(),
    });

    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}
