// --- File: crates/templi_config/src/models.rs ---

use serde::{Deserialize, Serialize};

// --- General Server Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16, // Overridden by PORT when set
    /// Name reported by the health endpoint.
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Fallback log level when RUST_LOG is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            service_name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

/// How the subscription lookup finds a user's active subscription.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileMode {
    /// List active subscriptions page by page and match locally.
    #[default]
    Scan,
    /// Ask the provider's search endpoint to filter on metadata first.
    Search,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReconcileConfig {
    #[serde(default)]
    pub mode: ReconcileMode,
    /// Records requested per provider call. Stripe accepts 1..=100.
    #[serde(default = "default_page_size")]
    pub page_size: u8,
    /// Upper bound on pages read by a single lookup in scan mode.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            mode: ReconcileMode::default(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebhookConfig {
    /// Maximum age of a signed webhook timestamp, in seconds.
    #[serde(default = "default_tolerance_secs")]
    pub tolerance_secs: i64,
    /// How long a processed event id is remembered.
    #[serde(default = "default_dedup_ttl_secs")]
    pub dedup_ttl_secs: u64,
    /// Maximum number of remembered event ids.
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            tolerance_secs: default_tolerance_secs(),
            dedup_ttl_secs: default_dedup_ttl_secs(),
            dedup_capacity: default_dedup_capacity(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CircuitBreakerSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Consecutive failures before the circuit opens.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Seconds the circuit stays open before a trial call is allowed.
    #[serde(default = "default_open_duration_secs")]
    pub open_duration_secs: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: default_failure_threshold(),
            open_duration_secs: default_open_duration_secs(),
        }
    }
}

// --- Stripe Config ---
// Secrets usually arrive through STRIPE_SECRET_KEY / STRIPE_WEBHOOK_SECRET.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StripeConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default, skip_serializing)]
    pub secret_key: Option<String>,
    #[serde(default, skip_serializing)]
    pub webhook_secret: Option<String>,
    /// Used when a checkout request carries no successUrl.
    #[serde(default)]
    pub default_success_url: Option<String>,
    /// Used when a checkout request carries no cancelUrl.
    #[serde(default)]
    pub default_cancel_url: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSettings,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            secret_key: None,
            webhook_secret: None,
            default_success_url: None,
            default_cancel_url: None,
            request_timeout_secs: default_request_timeout_secs(),
            reconcile: ReconcileConfig::default(),
            webhook: WebhookConfig::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
        }
    }
}

// --- CORS Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    /// Origin patterns; `*` matches any run of characters.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

// --- Unified App Configuration ---
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub stripe: StripeConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_service_name() -> String {
    "templi-payment-server".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_page_size() -> u8 {
    100
}

fn default_max_pages() -> u32 {
    10
}

fn default_tolerance_secs() -> i64 {
    300
}

fn default_dedup_ttl_secs() -> u64 {
    3 * 24 * 60 * 60 // Stripe keeps retrying for up to three days
}

fn default_dedup_capacity() -> usize {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_open_duration_secs() -> u64 {
    30
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "chrome-extension://*".to_string(),
        "https://*.google.com".to_string(),
        "https://*.stripe.com".to_string(),
    ]
}
