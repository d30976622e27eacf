// --- File: crates/templi_stripe/src/service.rs ---
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use templi_common::create_client;
use templi_common::services::{
    BillingProvider, BoxFuture, CheckoutSession, CheckoutSessionParams, PageRequest,
    SubscriptionPage, SubscriptionRecord,
};
use templi_config::StripeConfig;
use tracing::{debug, error, info};

use crate::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::error::StripeError;

/// Response FROM Stripe when a checkout session is created.
#[derive(Deserialize, Debug)]
struct StripeCheckoutSessionApiResponse {
    pub id: String,
    pub url: Option<String>,
}

/// Represents the list object returned by Stripe's list and search endpoints.
#[derive(Deserialize, Debug)]
struct StripeListObject<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

/// Stripe-backed [`BillingProvider`].
///
/// Every call goes out with the client's bounded timeout and through the
/// circuit breaker. Nothing is retried.
#[derive(Debug)]
pub struct StripeBillingService {
    http: reqwest::Client,
    api_base: String,
    secret_key: Option<String>,
    breaker: CircuitBreaker,
}

impl StripeBillingService {
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let http = create_client(config.request_timeout_secs, true)?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
            breaker: CircuitBreaker::new(config.circuit_breaker.clone()),
        })
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    fn secret_key(&self) -> Result<&str, StripeError> {
        self.secret_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| StripeError::ConfigError("STRIPE_SECRET_KEY is not set".to_string()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Sends `request` through the circuit breaker and decodes the body of a 2xx answer.
    ///
    /// The outcome is recorded after decoding, so an unreadable 2xx body counts
    /// against the provider too.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &str,
    ) -> Result<T, StripeError> {
        let permit = self.breaker.check()?;

        let result = execute(request).await.and_then(|body_text| {
            serde_json::from_str::<T>(&body_text).map_err(StripeError::from)
        });
        match &result {
            Err(e) if e.is_provider_failure() => {
                error!("[Stripe] {} failed: {}", operation, e);
                permit.failure();
            }
            // A 4xx still proves Stripe is answering.
            _ => permit.success(),
        }
        result
    }

    async fn create_session(
        &self,
        params: CheckoutSessionParams,
    ) -> Result<CheckoutSession, StripeError> {
        let secret_key = self.secret_key()?;
        let form_body = checkout_form_body(&params);
        let api_url = self.url("/v1/checkout/sessions");

        info!(
            "[Stripe] Creating subscription checkout session for user {} (price {})",
            params.user_id, params.price_id
        );

        let request = self
            .http
            .post(&api_url)
            .basic_auth(secret_key, None::<&str>)
            .form(&form_body);
        let session: StripeCheckoutSessionApiResponse =
            self.send(request, "create checkout session").await?;
        match session.url {
            Some(url) => {
                info!("[Stripe] Checkout session {} created", session.id);
                Ok(CheckoutSession {
                    id: session.id,
                    url,
                })
            }
            None => {
                error!("[Stripe] Checkout session {} has no URL", session.id);
                Err(StripeError::MissingCheckoutUrl)
            }
        }
    }

    async fn list_active(&self, page: PageRequest) -> Result<SubscriptionPage, StripeError> {
        let secret_key = self.secret_key()?;

        let mut query_params = vec![
            ("status", "active".to_string()),
            ("limit", page.limit.to_string()),
        ];
        if let Some(starting_after) = page.starting_after {
            query_params.push(("starting_after", starting_after));
        }
        debug!("[Stripe] Listing active subscriptions: {:?}", query_params);

        let request = self
            .http
            .get(self.url("/v1/subscriptions"))
            .basic_auth(secret_key, None::<&str>)
            .query(&query_params);
        let list: StripeListObject<SubscriptionRecord> =
            self.send(request, "list subscriptions").await?;
        Ok(SubscriptionPage {
            records: list.data,
            has_more: list.has_more,
        })
    }

    async fn search_active(
        &self,
        user_id: String,
        limit: u8,
    ) -> Result<SubscriptionPage, StripeError> {
        let secret_key = self.secret_key()?;
        let query = search_query_for_user(&user_id);
        debug!("[Stripe] Searching subscriptions: {}", query);

        let request = self
            .http
            .get(self.url("/v1/subscriptions/search"))
            .basic_auth(secret_key, None::<&str>)
            .query(&[("query", query), ("limit", limit.to_string())]);
        let list: StripeListObject<SubscriptionRecord> =
            self.send(request, "search subscriptions").await?;
        Ok(SubscriptionPage {
            records: list.data,
            has_more: list.has_more,
        })
    }
}

impl BillingProvider for StripeBillingService {
    type Error = StripeError;

    fn create_checkout_session(
        &self,
        params: CheckoutSessionParams,
    ) -> BoxFuture<'_, CheckoutSession, Self::Error> {
        Box::pin(self.create_session(params))
    }

    fn list_active_subscriptions(
        &self,
        page: PageRequest,
    ) -> BoxFuture<'_, SubscriptionPage, Self::Error> {
        Box::pin(self.list_active(page))
    }

    fn search_active_subscriptions(
        &self,
        user_id: &str,
        limit: u8,
    ) -> BoxFuture<'_, SubscriptionPage, Self::Error> {
        Box::pin(self.search_active(user_id.to_string(), limit))
    }
}

async fn execute(request: RequestBuilder) -> Result<String, StripeError> {
    let response = request.send().await?;
    let status = response.status();
    let body_text = response.text().await?;

    if status.is_success() {
        return Ok(body_text);
    }

    let message = extract_error_message(&body_text);
    info!(
        "[Stripe] API request failed with HTTP status: {}. Message: {}",
        status, message
    );
    Err(StripeError::ApiError {
        status_code: status.as_u16(),
        message,
    })
}

/// Pulls `error.message` out of a Stripe error body, falling back to the raw body.
fn extract_error_message(body_text: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body_text)
        .ok()
        .and_then(|json| {
            json.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body_text.to_string())
}

/// Form fields for `POST /v1/checkout/sessions`.
///
/// The user id lands on the session (reference field and metadata) and on the
/// subscription Stripe creates from it, which is what the lookup later reads.
pub(crate) fn checkout_form_body(params: &CheckoutSessionParams) -> Vec<(&'static str, String)> {
    vec![
        ("payment_method_types[]", "card".to_string()),
        ("mode", "subscription".to_string()),
        ("line_items[0][price]", params.price_id.clone()),
        ("line_items[0][quantity]", "1".to_string()),
        ("success_url", params.success_url.clone()),
        ("cancel_url", params.cancel_url.clone()),
        ("client_reference_id", params.user_id.clone()),
        ("metadata[userId]", params.user_id.clone()),
        ("subscription_data[metadata][userId]", params.user_id.clone()),
    ]
}

/// Stripe search query for active subscriptions tagged with `user_id`.
pub(crate) fn search_query_for_user(user_id: &str) -> String {
    let escaped = user_id.replace('\\', "\\\\").replace('\'', "\\'");
    format!("status:'active' AND metadata['userId']:'{}'", escaped)
}
