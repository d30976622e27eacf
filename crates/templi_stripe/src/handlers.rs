// --- File: crates/templi_stripe/src/handlers.rs ---
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    response::{Html, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use templi_common::{JsonBody, TempliError};
use templi_config::AppConfig;
use tracing::{debug, info};

use crate::idempotency::ProcessedEvents;
use crate::logic::{
    check_subscription, create_checkout, CheckSubscriptionRequest, CreateCheckoutRequest,
    CreateCheckoutResponse, DynBillingProvider, SubscriptionStatusResult,
};
use crate::webhook::{handle_webhook, SIGNATURE_HEADER};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

// --- State for Stripe Handlers ---
pub struct StripeState {
    pub config: Arc<AppConfig>,
    pub provider: Arc<DynBillingProvider>,
    pub processed_events: ProcessedEvents,
}

impl StripeState {
    pub fn new(config: Arc<AppConfig>, provider: Arc<DynBillingProvider>) -> Self {
        let processed_events = ProcessedEvents::from_config(&config.stripe.webhook);
        Self {
            config,
            provider,
            processed_events,
        }
    }
}

/// Body returned to Stripe for every accepted delivery.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct WebhookAck {
    pub received: bool,
}

/// Axum handler to create a Stripe Checkout Session.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/create-checkout",
    request_body = CreateCheckoutRequest,
    responses(
        (status = 200, description = "Stripe Checkout Session created", body = CreateCheckoutResponse),
        (status = 400, description = "Missing required fields"),
        (status = 500, description = "Stripe API error or server misconfiguration")
    ),
    tag = "Stripe"
))]
pub async fn create_checkout_handler(
    State(state): State<Arc<StripeState>>,
    JsonBody(payload): JsonBody<CreateCheckoutRequest>,
) -> Result<Json<CreateCheckoutResponse>, TempliError> {
    let response = create_checkout(state.provider.as_ref(), &state.config.stripe, payload).await?;
    Ok(Json(response))
}

/// Axum handler reporting whether a user holds an active subscription.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/check-subscription",
    request_body = CheckSubscriptionRequest,
    responses(
        (status = 200, description = "Subscription status for the user", body = SubscriptionStatusResult),
        (status = 400, description = "Missing userId"),
        (status = 500, description = "Stripe API error")
    ),
    tag = "Stripe"
))]
pub async fn check_subscription_handler(
    State(state): State<Arc<StripeState>>,
    JsonBody(payload): JsonBody<CheckSubscriptionRequest>,
) -> Result<Json<SubscriptionStatusResult>, TempliError> {
    let result = check_subscription(
        state.provider.as_ref(),
        &state.config.stripe.reconcile,
        payload,
    )
    .await?;
    Ok(Json(result))
}

/// Stripe's server-to-server notifications. Configure this URL in the Stripe Dashboard.
///
/// The body is taken as raw bytes: the signature covers them exactly.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/webhook",
    params(("Stripe-Signature" = String, Header, description = "t=<unix>,v1=<hex hmac>")),
    responses(
        (status = 200, description = "Webhook received and acknowledged", body = WebhookAck),
        (status = 400, description = "Invalid signature or payload"),
        (status = 500, description = "Webhook signing secret not configured")
    ),
    tag = "Stripe Webhooks"
))]
pub async fn stripe_webhook_handler(
    State(state): State<Arc<StripeState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, TempliError> {
    info!("[Stripe Webhook] Received webhook ({} bytes)", body.len());

    let sig_header = headers.get(SIGNATURE_HEADER).and_then(|h| h.to_str().ok());
    let stripe_config = &state.config.stripe;

    let receipt = handle_webhook(
        &body,
        sig_header,
        stripe_config.webhook_secret.as_deref(),
        &stripe_config.webhook,
        &state.processed_events,
    )?;

    debug!("[Stripe Webhook] Delivery outcome: {:?}", receipt);
    Ok(Json(WebhookAck { received: true }))
}

// --- Redirect Handlers (Client-Side) ---
// These are the success_url and cancel_url handed to Stripe

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct StripeRedirectQuery {
    // Stripe substitutes the checkout session ID into the success URL
    #[cfg_attr(feature = "openapi", param(example = "cs_test_a1..."))]
    pub session_id: Option<String>,
}

const SUCCESS_PAGE: &str = r#"<html>
  <head><title>Payment Successful</title></head>
  <body style="font-family: Arial; text-align: center; padding: 50px;">
    <h1>Payment Successful!</h1>
    <p>Your Templi Pro subscription is now active.</p>
    <p>You can close this tab and return to your extension.</p>
    <script>
      setTimeout(() => window.close(), 3000);
    </script>
  </body>
</html>"#;

const CANCEL_PAGE: &str = r#"<html>
  <head><title>Payment Cancelled</title></head>
  <body style="font-family: Arial; text-align: center; padding: 50px;">
    <h1>Payment Cancelled</h1>
    <p>No payment was processed.</p>
    <p>You can close this tab and return to your extension.</p>
    <script>
      setTimeout(() => window.close(), 3000);
    </script>
  </body>
</html>"#;

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/success",
    params(StripeRedirectQuery),
    responses((status = 200, description = "Checkout success page", content_type = "text/html")),
    tag = "Stripe Redirects"
))]
pub async fn checkout_success_handler(Query(params): Query<StripeRedirectQuery>) -> Html<&'static str> {
    info!(
        "User redirected to Stripe success URL. Session ID: {:?}",
        params.session_id
    );
    Html(SUCCESS_PAGE)
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/cancel",
    responses((status = 200, description = "Checkout cancellation page", content_type = "text/html")),
    tag = "Stripe Redirects"
))]
pub async fn checkout_cancel_handler() -> Html<&'static str> {
    info!("User redirected to Stripe cancel URL");
    Html(CANCEL_PAGE)
}
