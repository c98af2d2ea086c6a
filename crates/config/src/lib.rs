//! Configuration for the dispatch voice agent
//!
//! Settings are layered from YAML files and `DISPATCH_AGENT__*` environment
//! variables; see [`load_settings`].

pub mod settings;

pub use settings::{
    load_settings, ExtractionConfig, ObservabilityConfig, PersistenceBackend, PersistenceConfig,
    ServerConfig, Settings, TrackerConfig, WebhookConfig,
};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
