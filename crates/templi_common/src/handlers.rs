// --- File: crates/templi_common/src/handlers.rs ---
use axum::{extract::State, Json};
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;

use crate::models::HealthResponse;

/// State for the common routes.
#[derive(Clone, Debug)]
pub struct CommonState {
    pub service_name: String,
}

/// Liveness probe. Never touches the provider.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "Health"
))]
pub async fn health_handler(State(state): State<Arc<CommonState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        service: state.service_name.clone(),
    })
}
