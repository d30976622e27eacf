// --- File: crates/templi_stripe/src/logic.rs ---
use serde::{Deserialize, Serialize};
use templi_common::services::{
    BillingProvider, CheckoutSessionParams, PageRequest, SubscriptionRecord,
};
use templi_config::{ReconcileConfig, ReconcileMode, StripeConfig};
use tracing::{info, warn};

use crate::error::StripeError;

// Conditionally import ToSchema if openapi feature is enabled
#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// The provider object the handlers talk to.
pub type DynBillingProvider = dyn BillingProvider<Error = StripeError>;

/// Stripe substitutes the real session id for this token on redirect.
pub const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

// --- Data Structures ---

/// Request from the extension to start a subscription checkout.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CreateCheckoutRequest {
    #[cfg_attr(feature = "openapi", schema(example = "user_42"))]
    pub user_id: Option<String>,
    #[cfg_attr(feature = "openapi", schema(example = "price_1Pro"))]
    pub price_id: Option<String>,
    #[cfg_attr(feature = "openapi", schema(example = "https://example.com/success"))]
    pub success_url: Option<String>,
    #[cfg_attr(feature = "openapi", schema(example = "https://example.com/cancel"))]
    pub cancel_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CreateCheckoutResponse {
    #[cfg_attr(
        feature = "openapi",
        schema(example = "https://checkout.stripe.com/c/pay/cs_test_a1...")
    )]
    pub checkout_url: String,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CheckSubscriptionRequest {
    #[cfg_attr(feature = "openapi", schema(example = "user_42"))]
    pub user_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub enum Plan {
    Pro,
    Free,
}

/// Outcome of a subscription lookup. Computed per request, never cached.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SubscriptionStatusResult {
    pub is_active: bool,
    pub plan: Plan,
    /// `null` when no active subscription matched.
    #[cfg_attr(feature = "openapi", schema(example = "sub_123"))]
    pub subscription_id: Option<String>,
}

impl SubscriptionStatusResult {
    pub fn from_match(matched: Option<&SubscriptionRecord>) -> Self {
        match matched {
            Some(record) => Self {
                is_active: true,
                plan: Plan::Pro,
                subscription_id: Some(record.id.clone()),
            },
            None => Self {
                is_active: false,
                plan: Plan::Free,
                subscription_id: None,
            },
        }
    }
}

// --- Checkout ---

/// Appends the session-id placeholder to `success_url` as a query parameter.
pub fn success_url_with_session_placeholder(success_url: &str) -> String {
    let separator = if success_url.contains('?') { '&' } else { '?' };
    format!("{success_url}{separator}session_id={SESSION_ID_PLACEHOLDER}")
}

/// Treats absent and whitespace-only values alike.
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Validates the request and asks the provider for a hosted checkout session.
///
/// Validation failures return before the provider is contacted.
pub async fn create_checkout(
    provider: &DynBillingProvider,
    stripe_config: &StripeConfig,
    request: CreateCheckoutRequest,
) -> Result<CreateCheckoutResponse, StripeError> {
    let (Some(user_id), Some(price_id)) = (
        present(request.user_id.as_deref()),
        present(request.price_id.as_deref()),
    ) else {
        return Err(StripeError::InvalidRequest(
            "Missing required fields: userId and priceId".to_string(),
        ));
    };

    let success_url = present(request.success_url.as_deref())
        .or(present(stripe_config.default_success_url.as_deref()));
    let cancel_url = present(request.cancel_url.as_deref())
        .or(present(stripe_config.default_cancel_url.as_deref()));
    let (Some(success_url), Some(cancel_url)) = (success_url, cancel_url) else {
        return Err(StripeError::InvalidRequest(
            "Missing required fields: successUrl and cancelUrl".to_string(),
        ));
    };

    let params = CheckoutSessionParams {
        user_id: user_id.to_string(),
        price_id: price_id.to_string(),
        success_url: success_url_with_session_placeholder(success_url),
        cancel_url: cancel_url.to_string(),
    };

    let session = provider.create_checkout_session(params).await?;
    Ok(CreateCheckoutResponse {
        checkout_url: session.url,
    })
}

// --- Reconciliation ---

/// First record tagged with `user_id`, either in `metadata.userId` or in
/// `client_reference_id`. Records without metadata simply do not match.
pub fn find_subscription_for_user<'a>(
    records: &'a [SubscriptionRecord],
    user_id: &str,
) -> Option<&'a SubscriptionRecord> {
    records.iter().find(|record| {
        record.metadata_user_id() == Some(user_id)
            || record.client_reference_id.as_deref() == Some(user_id)
    })
}

/// Determines the user's plan from the provider's active subscriptions.
pub async fn check_subscription(
    provider: &DynBillingProvider,
    reconcile: &ReconcileConfig,
    request: CheckSubscriptionRequest,
) -> Result<SubscriptionStatusResult, StripeError> {
    let user_id = present(request.user_id.as_deref()).ok_or_else(|| {
        StripeError::InvalidRequest("Missing required field: userId".to_string())
    })?;

    let matched = match reconcile.mode {
        ReconcileMode::Scan => scan_for_user(provider, reconcile, user_id).await?,
        ReconcileMode::Search => search_for_user(provider, reconcile, user_id).await?,
    };

    let result = SubscriptionStatusResult::from_match(matched.as_ref());
    info!(
        "[Stripe Logic] Subscription check for user {}: active={}, subscription={:?}",
        user_id, result.is_active, result.subscription_id
    );
    Ok(result)
}

/// Walks the active-subscription list, at most `max_pages` pages.
async fn scan_for_user(
    provider: &DynBillingProvider,
    reconcile: &ReconcileConfig,
    user_id: &str,
) -> Result<Option<SubscriptionRecord>, StripeError> {
    let mut starting_after: Option<String> = None;

    for page_number in 1..=reconcile.max_pages {
        let page = provider
            .list_active_subscriptions(PageRequest {
                limit: reconcile.page_size,
                starting_after: starting_after.take(),
            })
            .await?;

        if let Some(found) = find_subscription_for_user(&page.records, user_id) {
            return Ok(Some(found.clone()));
        }

        let Some(last) = page.records.last() else {
            return Ok(None);
        };
        if !page.has_more {
            return Ok(None);
        }
        if page_number == reconcile.max_pages {
            warn!(
                "[Stripe Logic] Stopped after {} pages of {} active subscriptions without a match for user {}; more remain unread",
                reconcile.max_pages, reconcile.page_size, user_id
            );
            break;
        }
        starting_after = Some(last.id.clone());
    }

    Ok(None)
}

/// Lets Stripe filter on metadata, then applies the same local match.
async fn search_for_user(
    provider: &DynBillingProvider,
    reconcile: &ReconcileConfig,
    user_id: &str,
) -> Result<Option<SubscriptionRecord>, StripeError> {
    let page = provider
        .search_active_subscriptions(user_id, reconcile.page_size)
        .await?;
    Ok(find_subscription_for_user(&page.records, user_id).cloned())
}
