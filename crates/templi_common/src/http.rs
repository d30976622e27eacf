// --- File: crates/templi_common/src/http.rs ---
use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::error::{HttpStatusCode, TempliError};

// Include the client module
pub mod client;

/// Extension trait for TempliError to convert it to an Axum HTTP response.
pub trait IntoHttpResponse {
    /// Converts the error into an Axum HTTP response.
    fn into_http_response(self) -> Response;
}

impl IntoHttpResponse for TempliError {
    fn into_http_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status_code.is_server_error() {
            error!("{}", self);
        } else {
            warn!("{}", self);
        }

        // Callers get a flat `{"error": "<message>"}` body.
        let body = Json(json!({ "error": self.client_message() }));

        (status_code, body).into_response()
    }
}

/// Implement IntoResponse for TempliError so handlers can return `Result<_, TempliError>`.
impl IntoResponse for TempliError {
    fn into_response(self) -> Response {
        self.into_http_response()
    }
}

impl From<JsonRejection> for TempliError {
    fn from(rejection: JsonRejection) -> Self {
        TempliError::ValidationError(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

/// `Json` extractor whose rejection is a [`TempliError`], so malformed bodies
/// get the same `{"error": ...}` shape as every other failure.
#[derive(FromRequest, Debug)]
#[from_request(via(axum::Json), rejection(TempliError))]
pub struct JsonBody<T>(pub T);
