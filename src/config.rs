use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::payments::stripe::DEFAULT_API_BASE;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_CURRENCY: &str = "usd";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PAYMENT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;
const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024;
const DEFAULT_AUTH_AUDIENCE: &str = "authenticated";

/// Application configuration structure with validation
#[derive(Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[validate(length(min = 1))]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// CORS: allow credentials
    #[serde(default)]
    pub cors_allow_credentials: bool,

    /// Per-request timeout for inbound HTTP requests (seconds)
    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1, max = 300))]
    pub request_timeout_secs: u64,

    /// Maximum accepted request body in bytes
    #[serde(default = "default_max_body_size")]
    #[validate(range(min = 1024))]
    pub max_body_size: usize,

    /// Currency used for courses that do not specify one (ISO 4217)
    #[serde(default = "default_currency")]
    #[validate(custom = "validate_currency")]
    pub default_currency: String,

    /// Stripe secret API key
    #[validate(length(min = 1))]
    pub stripe_secret_key: String,

    /// Stripe API base URL, overridable for testing
    #[serde(default = "default_stripe_api_base")]
    pub stripe_api_base: String,

    /// Timeout for a single payment processor request (seconds)
    #[serde(default = "default_payment_timeout_secs")]
    #[validate(range(min = 1, max = 120))]
    pub payment_timeout_secs: u64,

    /// Payment webhook signing secret
    #[serde(default)]
    pub payment_webhook_secret: Option<String>,

    /// Accepted clock skew for webhook timestamps (seconds)
    #[serde(default = "default_webhook_tolerance_secs")]
    pub payment_webhook_tolerance_secs: u64,

    /// Backend REST base URL; the in-memory store is used when unset
    #[serde(default)]
    pub baas_url: Option<String>,

    /// Backend service-role key
    #[serde(default)]
    pub baas_service_key: Option<String>,

    /// Secret the backend signs user access tokens with (HS256)
    #[serde(default)]
    pub auth_jwt_secret: Option<String>,

    /// Required `aud` claim of user access tokens
    #[serde(default = "default_auth_audience")]
    pub auth_jwt_audience: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("environment", &self.environment)
            .field("log_level", &self.log_level)
            .field("default_currency", &self.default_currency)
            .field("stripe_api_base", &self.stripe_api_base)
            .field("baas_url", &self.baas_url)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Creates a new configuration with defaults for everything but the processor key
    pub fn new(stripe_secret_key: String, environment: String) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            environment,
            log_level: default_log_level(),
            log_json: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            request_timeout_secs: default_request_timeout_secs(),
            max_body_size: default_max_body_size(),
            default_currency: default_currency(),
            stripe_secret_key,
            stripe_api_base: default_stripe_api_base(),
            payment_timeout_secs: default_payment_timeout_secs(),
            payment_webhook_secret: None,
            payment_webhook_tolerance_secs: default_webhook_tolerance_secs(),
            baas_url: None,
            baas_service_key: None,
            auth_jwt_secret: None,
            auth_jwt_audience: default_auth_audience(),
        }
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Backend URL and service key, when both are configured
    pub fn baas(&self) -> Option<(&str, &str)> {
        match (&self.baas_url, &self.baas_service_key) {
            (Some(url), Some(key)) if !url.trim().is_empty() && !key.trim().is_empty() => {
                Some((url.as_str(), key.as_str()))
            }
            _ => None,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn payment_timeout(&self) -> Duration {
        Duration::from_secs(self.payment_timeout_secs)
    }

    pub fn webhook_secret(&self) -> Option<&str> {
        self.payment_webhook_secret
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }

    pub fn auth_secret(&self) -> Option<&str> {
        self.auth_jwt_secret
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if !self.is_development() {
            if self.webhook_secret().is_none() {
                let mut err = ValidationError::new("payment_webhook_secret_required");
                err.message = Some(
                    "Set APP__PAYMENT_WEBHOOK_SECRET so payment confirmations can be verified"
                        .into(),
                );
                errors.add("payment_webhook_secret", err);
            }

            if self.auth_secret().is_none() {
                let mut err = ValidationError::new("auth_jwt_secret_required");
                err.message = Some(
                    "Set APP__AUTH_JWT_SECRET so admin requests can be authenticated".into(),
                );
                errors.add("auth_jwt_secret", err);
            }
        }

        if self.is_production() {
            if self.baas().is_none() {
                let mut err = ValidationError::new("baas_required");
                err.message = Some(
                    "Production requires APP__BAAS_URL and APP__BAAS_SERVICE_KEY; the in-memory store is for development only".into(),
                );
                errors.add("baas_url", err);
            }

            if self.stripe_secret_key.starts_with("sk_test_") {
                let mut err = ValidationError::new("stripe_test_key_in_production");
                err.message = Some("A Stripe test key must not be used in production".into());
                errors.add("stripe_secret_key", err);
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_max_body_size() -> usize {
    DEFAULT_MAX_BODY_SIZE
}

fn default_stripe_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_payment_timeout_secs() -> u64 {
    DEFAULT_PAYMENT_TIMEOUT_SECS
}

fn default_webhook_tolerance_secs() -> u64 {
    DEFAULT_WEBHOOK_TOLERANCE_SECS
}

fn default_auth_audience() -> String {
    DEFAULT_AUTH_AUDIENCE.to_string()
}

fn validate_currency(currency: &str) -> Result<(), ValidationError> {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        let mut err = ValidationError::new("default_currency");
        err.message = Some("default_currency must be a three-letter ISO 4217 code".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("course_checkout_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);
    let filter = EnvFilter::new(filter_directive);

    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    // stripe_secret_key has no default; it must come from the environment or a config file.
    let config = Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("stripe_secret_key").is_err() {
        error!("Stripe secret key is not configured. Set APP__STRIPE_SECRET_KEY.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "stripe_secret_key is required but not configured. Set APP__STRIPE_SECRET_KEY environment variable."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
