//! Error types for the dispatch agent

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while parsing shared types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown scenario type: {0}")]
    UnknownScenario(String),
}
