// --- File: crates/templi_common/src/models.rs ---

use serde::{Deserialize, Serialize};

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    #[cfg_attr(feature = "openapi", schema(example = "ok"))]
    pub status: String,
    /// RFC 3339 UTC time at which the response was produced.
    #[cfg_attr(feature = "openapi", schema(example = "2025-01-01T12:00:00.000Z"))]
    pub timestamp: String,
    #[cfg_attr(feature = "openapi", schema(example = "templi-payment-server"))]
    pub service: String,
}
