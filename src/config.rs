use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use validator::{Validate, ValidationError};

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_ORDER_NUMBER_PREFIX: &str = "ORD";
const DEFAULT_TRANSACTION_TIMEOUT_MS: u64 = 10_000;

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL (postgres://... or sqlite://...)
    #[validate(length(min = 1))]
    pub database_url: String,

    /// HS256 signing secret for access and refresh tokens
    #[validate(length(min = 32))]
    pub jwt_secret: String,

    #[serde(default = "default_jwt_issuer")]
    pub jwt_issuer: String,

    #[serde(default = "default_jwt_audience")]
    pub jwt_audience: String,

    /// Lifetime of access tokens
    #[serde(default = "default_jwt_expiration_secs")]
    #[validate(range(min = 1))]
    pub jwt_expiration_secs: u64,

    /// Lifetime of refresh tokens
    #[serde(default = "default_jwt_refresh_expiration_secs")]
    #[validate(range(min = 1))]
    pub jwt_refresh_expiration_secs: u64,

    /// Platform operator created at startup when no super admin exists yet.
    /// All three must be set for the account to be created.
    #[serde(default)]
    pub bootstrap_admin_username: Option<String>,
    #[serde(default)]
    pub bootstrap_admin_email: Option<String>,
    #[serde(default)]
    pub bootstrap_admin_password: Option<String>,

    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub environment: String,

    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins; permissive when unset
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Upper bound for one order or pre-release unit of work, lease waits included
    #[serde(default = "default_transaction_timeout_ms")]
    #[validate(range(min = 1))]
    pub transaction_timeout_ms: u64,

    /// Fixed prefix of generated order numbers
    #[serde(default = "default_order_number_prefix")]
    #[validate(custom = "validate_order_number_prefix")]
    pub order_number_prefix: String,

    /// Whole-request timeout applied at the HTTP layer
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl AppConfig {
    /// Creates a configuration with defaults for everything but the essentials.
    pub fn new(
        database_url: String,
        jwt_secret: String,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            jwt_secret,
            jwt_issuer: default_jwt_issuer(),
            jwt_audience: default_jwt_audience(),
            jwt_expiration_secs: default_jwt_expiration_secs(),
            jwt_refresh_expiration_secs: default_jwt_refresh_expiration_secs(),
            bootstrap_admin_username: None,
            bootstrap_admin_email: None,
            bootstrap_admin_password: None,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            transaction_timeout_ms: default_transaction_timeout_ms(),
            order_number_prefix: default_order_number_prefix(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_millis(self.transaction_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn jwt_expiration(&self) -> Duration {
        Duration::from_secs(self.jwt_expiration_secs)
    }

    pub fn jwt_refresh_expiration(&self) -> Duration {
        Duration::from_secs(self.jwt_refresh_expiration_secs)
    }

    /// `(username, email, password)` of the bootstrap super admin, if configured.
    pub fn bootstrap_admin(&self) -> Option<(&str, &str, &str)> {
        match (
            self.bootstrap_admin_username.as_deref(),
            self.bootstrap_admin_email.as_deref(),
            self.bootstrap_admin_password.as_deref(),
        ) {
            (Some(username), Some(email), Some(password)) => Some((username, email, password)),
            _ => None,
        }
    }

    /// Parsed CORS origins; empty when none are configured.
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
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

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_jwt_issuer() -> String {
    "retail-auth".to_string()
}

fn default_jwt_audience() -> String {
    "retail-backoffice".to_string()
}

fn default_jwt_expiration_secs() -> u64 {
    15 * 60
}

fn default_jwt_refresh_expiration_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_db_max_connections() -> u32 {
    16
}

fn default_db_min_connections() -> u32 {
    2
}

fn default_db_connect_timeout_secs() -> u64 {
    30
}

fn default_db_idle_timeout_secs() -> u64 {
    600
}

fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_transaction_timeout_ms() -> u64 {
    DEFAULT_TRANSACTION_TIMEOUT_MS
}

fn default_order_number_prefix() -> String {
    DEFAULT_ORDER_NUMBER_PREFIX.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_order_number_prefix(prefix: &str) -> Result<(), ValidationError> {
    let valid = !prefix.is_empty()
        && prefix.len() <= 8
        && prefix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("order_number_prefix");
        err.message = Some("Must be 1-8 upper-case ASCII letters or digits".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter.
/// `RUST_LOG` wins when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("retail_backoffice={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. `config/default.toml`
/// 3. `config/{RUN_ENV}.toml`
/// 4. Environment variables (`APP__*`)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    // jwt_secret has no default and must come from a file or APP__JWT_SECRET.
    let builder = Config::builder()
        .set_default("database_url", "sqlite://backoffice.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", run_env.clone())?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let config: AppConfig = builder.build()?.try_deserialize()?;
    config.validate()?;

    info!(
        environment = %config.environment,
        host = %config.host,
        port = config.port,
        "Configuration loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            "a-test-secret-that-is-definitely-long-enough".into(),
            "127.0.0.1".into(),
            8080,
            "test".into(),
        )
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = base_config();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.order_number_prefix, "ORD");
        assert_eq!(cfg.transaction_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn short_jwt_secret_is_rejected() {
        let mut cfg = base_config();
        cfg.jwt_secret = "short".into();
        let errors = cfg.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("jwt_secret"));
    }

    #[test]
    fn order_number_prefix_must_be_upper_alphanumeric() {
        let mut cfg = base_config();
        cfg.order_number_prefix = "ord-".into();
        let errors = cfg.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("order_number_prefix"));
    }

    #[test]
    fn cors_origins_are_trimmed() {
        let mut cfg = base_config();
        cfg.cors_allowed_origins = Some(" https://a.example , ,https://b.example".into());
        assert_eq!(
            cfg.cors_origins(),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn token_lifetimes_default_to_fifteen_minutes_and_seven_days() {
        let cfg = base_config();
        assert_eq!(cfg.jwt_expiration(), Duration::from_secs(900));
        assert_eq!(cfg.jwt_refresh_expiration(), Duration::from_secs(604_800));
    }

    #[test]
    fn bootstrap_admin_needs_every_field() {
        let mut cfg = base_config();
        cfg.bootstrap_admin_username = Some("root".into());
        cfg.bootstrap_admin_email = Some("root@example.com".into());
        assert!(cfg.bootstrap_admin().is_none());

        cfg.bootstrap_admin_password = Some("R00t!pass".into());
        assert_eq!(
            cfg.bootstrap_admin(),
            Some(("root", "root@example.com", "R00t!pass"))
        );
    }
}
