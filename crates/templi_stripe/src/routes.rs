// --- File: crates/templi_stripe/src/routes.rs ---

use crate::handlers::{
    check_subscription_handler, checkout_cancel_handler, checkout_success_handler,
    create_checkout_handler, stripe_webhook_handler, StripeState,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Creates a router containing all routes for the Stripe feature.
pub fn routes(state: Arc<StripeState>) -> Router {
    Router::new()
        .route("/create-checkout", post(create_checkout_handler))
        .route("/check-subscription", post(check_subscription_handler))
        // Server-to-server notifications from Stripe
        .route("/webhook", post(stripe_webhook_handler))
        // User-facing redirect endpoints (GET)
        .route("/success", get(checkout_success_handler))
        .route("/cancel", get(checkout_cancel_handler))
        .with_state(state)
}
