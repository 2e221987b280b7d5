use aws_config::BehaviorVersion;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Prefix of every environment variable the service reads
pub const ENV_PREFIX: &str = "STOREFRONT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {message}")]
    LoadError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub storage: StorageConfig,
    pub checkout: CheckoutConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_session_idle_timeout")]
    pub session_idle_timeout_seconds: u64,
    #[serde(default = "default_checked_out_retention")]
    pub checked_out_retention_seconds: u64,
    #[serde(default = "default_session_sweep_interval")]
    pub session_sweep_interval_seconds: u64,
}

/// Where the service collection is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    #[serde(alias = "DynamoDB", alias = "DYNAMODB")]
    DynamoDb,
    #[serde(alias = "FILE")]
    File,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_source")]
    pub catalog_source: CatalogSource,
    #[serde(default = "default_services_table")]
    pub services_table_name: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_catalog_seed_path")]
    pub catalog_seed_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_cart_key_prefix")]
    pub cart_key_prefix: String,
}

/// Destination of checkout hand-offs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutSinkKind {
    Screen,
    #[serde(alias = "EventBridge")]
    EventBridge,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutConfig {
    #[serde(default = "default_checkout_sink")]
    pub checkout_sink: CheckoutSinkKind,
    #[serde(default = "default_event_bus_name")]
    pub event_bus_name: String,
    #[serde(default = "default_event_source_name")]
    pub event_source_name: String,
    #[serde(default = "default_event_retry_attempts")]
    pub event_retry_attempts: u32,
    #[serde(default = "default_checkout_toast_duration_ms")]
    pub checkout_toast_duration_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub enable_json_logging: bool,
}

impl Config {
    /// Load every section from `STOREFRONT_*` environment variables
    pub fn from_environment() -> Result<Self, ConfigError> {
        info!("Loading configuration from environment");
        Self::from_source(config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Load every section from an explicit environment source
    pub fn from_source(source: config::Environment) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(source)
            .build()
            .map_err(|e| ConfigError::LoadError {
                message: format!("Failed to load config: {}", e),
            })?;

        let config = Config {
            server: deserialize_section(&settings, "server")?,
            catalog: deserialize_section(&settings, "catalog")?,
            storage: deserialize_section(&settings, "storage")?,
            checkout: deserialize_section(&settings, "checkout")?,
            observability: deserialize_section(&settings, "observability")?,
        };

        config.validate()?;

        info!("Configuration loaded successfully");
        debug!("Configuration: {:?}", config);

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(validation_error("Server port cannot be 0"));
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(validation_error("Request timeout cannot be 0"));
        }

        if self.server.session_idle_timeout_seconds == 0 {
            return Err(validation_error("Session idle timeout cannot be 0"));
        }

        if self.server.session_sweep_interval_seconds == 0 {
            return Err(validation_error("Session sweep interval cannot be 0"));
        }

        match self.catalog.catalog_source {
            CatalogSource::DynamoDb if self.catalog.services_table_name.trim().is_empty() => {
                return Err(validation_error("Services table name cannot be empty"));
            }
            CatalogSource::File if self.catalog.catalog_seed_path.as_os_str().is_empty() => {
                return Err(validation_error("Catalog seed path cannot be empty"));
            }
            _ => {}
        }

        if self.storage.data_dir.as_os_str().is_empty() {
            return Err(validation_error("Data directory cannot be empty"));
        }

        if self.storage.cart_key_prefix.trim().is_empty() {
            return Err(validation_error("Cart key prefix cannot be empty"));
        }

        if self.checkout.checkout_sink == CheckoutSinkKind::EventBridge {
            if self.checkout.event_bus_name.trim().is_empty() {
                return Err(validation_error("Event bus name cannot be empty"));
            }
            if self.checkout.event_source_name.trim().is_empty() {
                return Err(validation_error("Event source name cannot be empty"));
            }
            if self.checkout.event_retry_attempts == 0 {
                return Err(validation_error("Event retry attempts must be at least 1"));
            }
            if self.checkout.event_retry_attempts > crate::models::MAX_EVENT_RETRY_ATTEMPTS {
                return Err(ConfigError::ValidationError {
                    message: format!(
                        "Event retry attempts cannot exceed {}",
                        crate::models::MAX_EVENT_RETRY_ATTEMPTS
                    ),
                });
            }
        }

        if self.checkout.checkout_toast_duration_ms == 0 {
            return Err(validation_error("Checkout toast duration cannot be 0"));
        }

        Ok(())
    }

    /// Whether any adapter needs AWS credentials and clients
    pub fn needs_aws(&self) -> bool {
        self.catalog.catalog_source == CatalogSource::DynamoDb
            || self.checkout.checkout_sink == CheckoutSinkKind::EventBridge
    }

    pub async fn load_aws_config(&self) -> aws_config::SdkConfig {
        aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(self.catalog.region.clone()))
            .load()
            .await
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session_expiry(&self) -> crate::services::SessionExpiry {
        crate::services::SessionExpiry {
            idle_timeout: Duration::from_secs(self.session_idle_timeout_seconds),
            checked_out_retention: Duration::from_secs(self.checked_out_retention_seconds),
        }
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval_seconds)
    }
}

impl CheckoutConfig {
    pub fn event_config(&self) -> crate::models::EventConfig {
        crate::models::EventConfig {
            event_bus_name: self.event_bus_name.clone(),
            source_name: self.event_source_name.clone(),
            retry_attempts: self.event_retry_attempts,
        }
    }
}

fn deserialize_section<T: DeserializeOwned>(
    settings: &config::Config,
    section: &str,
) -> Result<T, ConfigError> {
    settings
        .clone()
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to deserialize {} config: {}", section, e),
        })
}

fn validation_error(message: &str) -> ConfigError {
    ConfigError::ValidationError {
        message: message.to_string(),
    }
}

// Default value functions
pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}

pub(crate) fn default_timeout() -> u64 {
    30
}

pub(crate) fn default_session_idle_timeout() -> u64 {
    30 * 60
}

pub(crate) fn default_checked_out_retention() -> u64 {
    60
}

pub(crate) fn default_session_sweep_interval() -> u64 {
    30
}

pub(crate) fn default_catalog_source() -> CatalogSource {
    CatalogSource::File
}

pub(crate) fn default_services_table() -> String {
    "Service".to_string()
}

pub(crate) fn default_region() -> String {
    "us-west-2".to_string()
}

pub(crate) fn default_catalog_seed_path() -> PathBuf {
    PathBuf::from("data/services.json")
}

pub(crate) fn default_data_dir() -> PathBuf {
    PathBuf::from(".storefront")
}

pub(crate) fn default_cart_key_prefix() -> String {
    "@cart".to_string()
}

pub(crate) fn default_checkout_sink() -> CheckoutSinkKind {
    CheckoutSinkKind::Screen
}

pub(crate) fn default_event_bus_name() -> String {
    "default".to_string()
}

pub(crate) fn default_event_source_name() -> String {
    "spa.storefront".to_string()
}

pub(crate) fn default_event_retry_attempts() -> u32 {
    3
}

pub(crate) fn default_checkout_toast_duration_ms() -> u64 {
    crate::models::CHECKOUT_TOAST_DURATION_MS
}

pub(crate) fn default_service_name() -> String {
    "spa-storefront".to_string()
}

pub(crate) fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}
