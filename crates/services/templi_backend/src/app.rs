// --- File: crates/services/templi_backend/src/app.rs ---
use axum::Router;
use templi_common::{not_found, TempliError};
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::cors::cors_layer;

async fn endpoint_not_found() -> TempliError {
    not_found("Endpoint not found")
}

/// Assembles the full application: feature routers, docs, fallback and layers.
pub fn build_app(state: AppState) -> Router {
    let common_router = templi_common::routes(state.config.server.service_name.clone());
    let stripe_router = templi_stripe::routes(state.stripe.clone());

    #[allow(unused_mut)] // mutated only with the openapi feature
    let mut app = Router::new().merge(common_router).merge(stripe_router);

    // Conditionally add Swagger UI and JSON endpoint if openapi feature enabled
    #[cfg(feature = "openapi")]
    {
        use templi_stripe::doc::StripeApiDoc;
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        #[derive(OpenApi)]
        #[openapi(
            info(
                title = "Templi Payment API",
                version = "0.1.0",
                description = "Subscription checkout, status and Stripe webhooks for the Templi extension",
                license(name = "MIT", url = "https://opensource.org/licenses/MIT")
            ),
            paths(templi_common::handlers::health_handler),
            tags((name = "Health", description = "Service health")),
        )]
        struct ApiDoc;

        let mut openapi_doc = ApiDoc::openapi();
        openapi_doc.merge(StripeApiDoc::openapi());
        tracing::info!("Adding Swagger UI at /docs");

        app = app.merge(SwaggerUi::new("/docs").url("/docs/openapi.json", openapi_doc));
    }

    app.fallback(endpoint_not_found)
        .layer(cors_layer(&state.config.cors))
        .layer(TraceLayer::new_for_http())
}
