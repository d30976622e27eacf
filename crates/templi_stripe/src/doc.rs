// --- File: crates/templi_stripe/src/doc.rs ---
#![cfg(feature = "openapi")]
use utoipa::OpenApi;

use crate::handlers::WebhookAck;
use crate::logic::{
    CheckSubscriptionRequest, CreateCheckoutRequest, CreateCheckoutResponse, Plan,
    SubscriptionStatusResult,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::create_checkout_handler,
        crate::handlers::check_subscription_handler,
        crate::handlers::stripe_webhook_handler,
        crate::handlers::checkout_success_handler,
        crate::handlers::checkout_cancel_handler
    ),
    components(
        schemas(
            CreateCheckoutRequest, CreateCheckoutResponse,
            CheckSubscriptionRequest, SubscriptionStatusResult, Plan,
            WebhookAck
        )
    ),
    tags(
        (name = "Stripe", description = "Subscription checkout and status for the Templi extension"),
        (name = "Stripe Webhooks", description = "Stripe Server-to-Server Webhooks"),
        (name = "Stripe Redirects", description = "User-facing redirect pages for Stripe Checkout")
    )
)]
pub struct StripeApiDoc;
