//! Shared fixtures for the router and service tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use templi_common::services::{
    BillingProvider, BoxFuture, CheckoutSession, CheckoutSessionParams, PageRequest,
    SubscriptionPage, SubscriptionRecord,
};
use templi_config::AppConfig;
use templi_stripe::{StripeError, StripeState};

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

/// In-memory provider that records every call.
#[derive(Default)]
pub struct FakeProvider {
    pub subscriptions: Vec<SubscriptionRecord>,
    /// When set, every call fails with a Stripe API error carrying this message.
    pub api_error: Option<String>,
    pub checkout_calls: Mutex<Vec<CheckoutSessionParams>>,
    pub list_calls: Mutex<Vec<PageRequest>>,
}

impl FakeProvider {
    pub fn with_subscriptions(subscriptions: Vec<SubscriptionRecord>) -> Self {
        Self {
            subscriptions,
            ..Default::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            api_error: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.checkout_calls.lock().unwrap().len() + self.list_calls.lock().unwrap().len()
    }

    fn error(&self) -> Option<StripeError> {
        self.api_error.as_ref().map(|message| StripeError::ApiError {
            status_code: 400,
            message: message.clone(),
        })
    }
}

impl BillingProvider for FakeProvider {
    type Error = StripeError;

    fn create_checkout_session(
        &self,
        params: CheckoutSessionParams,
    ) -> BoxFuture<'_, CheckoutSession, Self::Error> {
        self.checkout_calls.lock().unwrap().push(params);
        let result = match self.error() {
            Some(err) => Err(err),
            None => Ok(CheckoutSession {
                id: "cs_test_123".to_string(),
                url: "https://checkout.stripe.com/c/pay/cs_test_123".to_string(),
            }),
        };
        Box::pin(async move { result })
    }

    fn list_active_subscriptions(
        &self,
        page: PageRequest,
    ) -> BoxFuture<'_, SubscriptionPage, Self::Error> {
        self.list_calls.lock().unwrap().push(page);
        let result = match self.error() {
            Some(err) => Err(err),
            None => Ok(SubscriptionPage {
                records: self.subscriptions.clone(),
                has_more: false,
            }),
        };
        Box::pin(async move { result })
    }

    fn search_active_subscriptions(
        &self,
        _user_id: &str,
        _limit: u8,
    ) -> BoxFuture<'_, SubscriptionPage, Self::Error> {
        let records = self.subscriptions.clone();
        Box::pin(async move {
            Ok(SubscriptionPage {
                records,
                has_more: false,
            })
        })
    }
}

pub fn active_subscription(id: &str, user_id: &str) -> SubscriptionRecord {
    SubscriptionRecord {
        id: id.to_string(),
        status: "active".to_string(),
        metadata: Some(HashMap::from([("userId".to_string(), user_id.to_string())])),
        client_reference_id: None,
    }
}

pub fn test_config() -> Arc<AppConfig> {
    let mut config = AppConfig::default();
    config.stripe.secret_key = Some("sk_test_123".to_string());
    config.stripe.webhook_secret = Some(WEBHOOK_SECRET.to_string());
    Arc::new(config)
}

pub fn test_state(provider: Arc<FakeProvider>) -> Arc<StripeState> {
    Arc::new(StripeState::new(test_config(), provider))
}
