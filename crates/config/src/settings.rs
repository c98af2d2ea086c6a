//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Conversation tracker limits
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Structured-extraction provider
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Voice provider webhook settings
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Storage backend
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tracker.max_uncooperative_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tracker.max_uncooperative_retries".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        if self.tracker.cleanup_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tracker.cleanup_interval_secs".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        if !(0.0..=2.0).contains(&self.extraction.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "extraction.temperature".to_string(),
                message: format!("must be between 0.0 and 2.0, got {}", self.extraction.temperature),
            });
        }

        if self.persistence.backend == PersistenceBackend::Scylla && self.persistence.hosts.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "persistence.hosts".to_string(),
                message: "at least one host is required for the scylla backend".to_string(),
            });
        }

        if self.webhook.secret.as_deref().map(str::is_empty).unwrap_or(true) {
            tracing::warn!("webhook.secret is not set; webhook signatures will not be verified");
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path the voice provider posts lifecycle events to
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_webhook_path() -> String {
    "/webhooks/retell".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            webhook_path: default_webhook_path(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Retry limits for unclear and uncooperative driver responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Uncooperative answers tolerated before ending the call
    #[serde(default = "default_max_uncooperative_retries")]
    pub max_uncooperative_retries: u32,

    /// Repeat requests allowed before handing off to a human
    #[serde(default = "default_max_repeat_requests")]
    pub max_repeat_requests: u32,

    /// Open trackers idle longer than this are dropped
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// How long closed call ids are remembered for duplicate detection
    #[serde(default = "default_closed_retention_secs")]
    pub closed_retention_secs: u64,

    /// Interval of the registry cleanup sweep
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

fn default_max_uncooperative_retries() -> u32 {
    3
}
fn default_max_repeat_requests() -> u32 {
    2
}
fn default_idle_timeout_secs() -> u64 {
    3600
}
fn default_closed_retention_secs() -> u64 {
    86400
}
fn default_cleanup_interval_secs() -> u64 {
    60
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_uncooperative_retries: default_max_uncooperative_retries(),
            max_repeat_requests: default_max_repeat_requests(),
            idle_timeout_secs: default_idle_timeout_secs(),
            closed_retention_secs: default_closed_retention_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

/// Structured-extraction provider (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// API key; falls back to the OPENAI_API_KEY environment variable
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature, kept low for consistent extraction
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_extraction_timeout")]
    pub timeout_seconds: u64,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_extraction_timeout() -> u64 {
    60
}

impl ExtractionConfig {
    /// Configured key, else OPENAI_API_KEY
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            timeout_seconds: default_extraction_timeout(),
        }
    }
}

/// Voice provider webhook settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Shared secret for HMAC-SHA256 body signatures. Unset skips verification.
    #[serde(default)]
    pub secret: Option<String>,

    /// Header carrying the hex signature
    #[serde(default = "default_signature_header")]
    pub signature_header: String,
}

fn default_signature_header() -> String {
    "x-retell-signature".to_string()
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret: None,
            signature_header: default_signature_header(),
        }
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceBackend {
    #[default]
    Memory,
    Scylla,
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub backend: PersistenceBackend,

    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,

    #[serde(default = "default_keyspace")]
    pub keyspace: String,

    #[serde(default = "default_replication_factor")]
    pub replication_factor: u8,
}

fn default_hosts() -> Vec<String> {
    vec!["127.0.0.1:9042".to_string()]
}
fn default_keyspace() -> String {
    "dispatch_agent".to_string()
}
fn default_replication_factor() -> u8 {
    1
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: PersistenceBackend::default(),
            hosts: default_hosts(),
            keyspace: default_keyspace(),
            replication_factor: default_replication_factor(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Enable metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (DISPATCH_AGENT__ prefix, `__` separator)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("DISPATCH_AGENT")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.tracker.max_uncooperative_retries, 3);
        assert_eq!(settings.tracker.max_repeat_requests, 2);
        assert_eq!(settings.extraction.model, "gpt-4o-mini");
        assert_eq!(settings.persistence.backend, PersistenceBackend::Memory);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = Settings::default();
        settings.tracker.max_uncooperative_retries = 0;
        assert!(settings.validate().is_err());

        settings.tracker.max_uncooperative_retries = 3;
        settings.tracker.cleanup_interval_secs = 0;
        assert!(settings.validate().is_err());

        settings.tracker.cleanup_interval_secs = 60;
        settings.extraction.temperature = 3.5;
        assert!(settings.validate().is_err());

        settings.extraction.temperature = 0.1;
        settings.persistence.backend = PersistenceBackend::Scylla;
        settings.persistence.hosts.clear();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_partial_sections_use_defaults() {
        let settings: Settings =
            serde_json_like(r#"{"tracker": {"max_repeat_requests": 4}}"#);
        assert_eq!(settings.tracker.max_repeat_requests, 4);
        assert_eq!(settings.tracker.max_uncooperative_retries, 3);
        assert_eq!(settings.tracker.idle_timeout_secs, 3600);
        assert_eq!(settings.server.webhook_path, "/webhooks/retell");
    }

    fn serde_json_like(source: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(source, config::FileFormat::Json))
            .build()
            .and_then(|c| c.try_deserialize())
            .unwrap()
    }
}
