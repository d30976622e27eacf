use config::{Config, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use std::env;
use tracing::debug;

pub mod models;
pub use models::*;

/// Prefix for structured overrides, e.g. `TEMPLI__STRIPE__RECONCILE__PAGE_SIZE=50`.
pub const ENV_PREFIX: &str = "TEMPLI";

/// Loads the application configuration.
///
/// Sources, later ones winning:
/// 1. `<config dir>/default.*` (optional)
/// 2. `<config dir>/<RUN_ENV>.*` (optional, RUN_ENV defaults to `debug`)
/// 3. `TEMPLI__*` environment variables
/// 4. the plain `PORT`, `STRIPE_SECRET_KEY` and `STRIPE_WEBHOOK_SECRET` variables
///
/// The config directory is `config` unless `TEMPLI_CONFIG_DIR` says otherwise.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();

    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "debug".to_string());
    let config_dir = env::var("TEMPLI_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    debug!("Loading configuration from '{}' for RUN_ENV={}", config_dir, run_env);

    let builder = Config::builder()
        .add_source(File::with_name(&format!("{config_dir}/default")).required(false))
        .add_source(File::with_name(&format!("{config_dir}/{run_env}")).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("cors.allowed_origins")
                .try_parsing(true),
        )
        .set_override_option("server.port", non_empty_var("PORT"))?
        .set_override_option("stripe.secret_key", non_empty_var("STRIPE_SECRET_KEY"))?
        .set_override_option("stripe.webhook_secret", non_empty_var("STRIPE_WEBHOOK_SECRET"))?;

    let config: AppConfig = builder.build()?.try_deserialize()?;
    validate(&config)?;
    Ok(config)
}

/// Rejects values the rest of the server cannot work with.
pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    let reconcile = &config.stripe.reconcile;
    if !(1..=100).contains(&reconcile.page_size) {
        return Err(ConfigError::Message(format!(
            "stripe.reconcile.page_size must be between 1 and 100, got {}",
            reconcile.page_size
        )));
    }
    if reconcile.max_pages == 0 {
        return Err(ConfigError::Message(
            "stripe.reconcile.max_pages must be at least 1".to_string(),
        ));
    }
    if config.stripe.request_timeout_secs == 0 {
        return Err(ConfigError::Message(
            "stripe.request_timeout_secs must be greater than 0".to_string(),
        ));
    }
    if config.stripe.webhook.tolerance_secs <= 0 {
        return Err(ConfigError::Message(
            "stripe.webhook.tolerance_secs must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

static INIT_DOTENV: OnceCell<()> = OnceCell::new();

/// Loads the dotenv file into the process environment, once.
///
/// `DOTENV_OVERRIDE` selects a different file; a missing file is not an error.
/// Returns the path that was used.
pub fn ensure_dotenv_loaded() -> String {
    let dotenv_path = env::var("DOTENV_OVERRIDE").unwrap_or_else(|_| ".env".to_string());

    INIT_DOTENV.get_or_init(|| {
        dotenv::from_filename(&dotenv_path).ok();
    });

    dotenv_path
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> Result<AppConfig, ConfigError> {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_empty_source_yields_defaults() {
        let config = from_toml("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.service_name, "templi-payment-server");
        assert_eq!(config.stripe.api_base, "https://api.stripe.com");
        assert_eq!(config.stripe.request_timeout_secs, 10);
        assert_eq!(config.stripe.reconcile.mode, ReconcileMode::Scan);
        assert_eq!(config.stripe.reconcile.page_size, 100);
        assert!(config.stripe.secret_key.is_none());
        assert!(config.stripe.circuit_breaker.enabled);
        assert_eq!(config.cors.allowed_origins.len(), 3);
    }

    #[test]
    fn test_partial_sections_keep_remaining_defaults() {
        let config = from_toml(
            r#"
            [server]
            port = 8080

            [stripe.reconcile]
            mode = "search"
            page_size = 25
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.stripe.reconcile.mode, ReconcileMode::Search);
        assert_eq!(config.stripe.reconcile.page_size, 25);
        assert_eq!(config.stripe.reconcile.max_pages, 10);
        assert_eq!(config.stripe.webhook.tolerance_secs, 300);
    }

    #[test]
    fn test_page_size_out_of_range_is_rejected() {
        let err = from_toml("[stripe.reconcile]\npage_size = 0").unwrap_err();
        assert!(err.to_string().contains("page_size"));

        let err = from_toml("[stripe.reconcile]\npage_size = 101").unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let err = from_toml("[stripe]\nrequest_timeout_secs = 0").unwrap_err();
        assert!(err.to_string().contains("request_timeout_secs"));
    }
}
