// --- File: crates/services/templi_backend/src/app_state.rs ---
use std::sync::Arc;
use templi_config::AppConfig;
use templi_stripe::{DynBillingProvider, StripeBillingService, StripeError, StripeState};
use tracing::warn;

/// Everything the router needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub stripe: Arc<StripeState>,
}

impl AppState {
    /// Wires the Stripe-backed provider from configuration.
    ///
    /// Missing Stripe secrets are not fatal here: the affected endpoints answer
    /// 500 until they are configured.
    pub fn new(config: Arc<AppConfig>) -> Result<Self, StripeError> {
        if config.stripe.secret_key.is_none() {
            warn!("STRIPE_SECRET_KEY is not set; checkout and subscription checks will fail");
        }
        if config.stripe.webhook_secret.is_none() {
            warn!("STRIPE_WEBHOOK_SECRET is not set; webhooks will be rejected");
        }

        let provider = Arc::new(StripeBillingService::new(&config.stripe)?);
        Ok(Self::with_provider(config, provider))
    }

    /// Builds the state around any provider, e.g. an in-memory one in tests.
    pub fn with_provider(config: Arc<AppConfig>, provider: Arc<DynBillingProvider>) -> Self {
        let stripe = Arc::new(StripeState::new(config.clone(), provider));
        Self { config, stripe }
    }
}
