// --- File: crates/templi_common/src/services.rs ---
//! Service abstractions for the external payment provider.
//!
//! Handlers talk to the provider only through [`BillingProvider`], which keeps
//! the request logic testable without network access.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Operations the server needs from a subscription billing provider.
pub trait BillingProvider: Send + Sync {
    /// Error type returned by provider operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Create a hosted checkout session for a subscription.
    fn create_checkout_session(
        &self,
        params: CheckoutSessionParams,
    ) -> BoxFuture<'_, CheckoutSession, Self::Error>;

    /// List one page of subscriptions whose status is `active`.
    fn list_active_subscriptions(
        &self,
        page: PageRequest,
    ) -> BoxFuture<'_, SubscriptionPage, Self::Error>;

    /// Server-side search for active subscriptions tagged with `user_id` in metadata.
    fn search_active_subscriptions(
        &self,
        user_id: &str,
        limit: u8,
    ) -> BoxFuture<'_, SubscriptionPage, Self::Error>;
}

/// Everything the provider needs to open a subscription checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionParams {
    /// Local user id, used for both the reference field and metadata.
    pub user_id: String,
    /// Provider price (plan) identifier.
    pub price_id: String,
    /// Redirect after payment; already carries the session-id placeholder.
    pub success_url: String,
    /// Redirect when the user backs out.
    pub cancel_url: String,
}

/// Handle returned by the provider for a newly created checkout session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Cursor-based page request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u8,
    /// Id of the last record of the previous page.
    pub starting_after: Option<String>,
}

/// A provider-owned subscription as seen by the reconciler. Read only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionRecord {
    pub id: String,
    pub status: String,
    /// Absent metadata is treated like an empty map.
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
}

impl SubscriptionRecord {
    /// The `userId` metadata entry, if any.
    pub fn metadata_user_id(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("userId"))
            .map(String::as_str)
    }
}

/// One page of subscription records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionPage {
    pub records: Vec<SubscriptionRecord>,
    /// Whether the provider has more records after this page.
    pub has_more: bool,
}
