//! Structured-extraction provider trait

use async_trait::async_trait;
use thiserror::Error;

use crate::contract::ExtractionContract;
use crate::FieldMap;

/// Failure kinds reported by a structured-extraction provider.
///
/// A failure is never mapped to an empty output; callers decide how to degrade.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractorError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Empty response from provider")]
    EmptyResponse,

    #[error("Invalid JSON response: {0}")]
    InvalidJson(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Raw output of one extraction call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderOutput {
    /// Fields parsed from the provider's JSON object, unvalidated
    pub fields: FieldMap,
    /// Provider response metadata kept for auditing (model, usage, ...)
    pub raw: serde_json::Value,
}

impl ProviderOutput {
    pub fn new(fields: FieldMap) -> Self {
        Self {
            fields,
            raw: serde_json::Value::Null,
        }
    }
}

/// Provider that fills an extraction contract from a transcript
#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    /// Extract contract fields from the transcript. Unknown fields should come
    /// back as null rather than guessed.
    async fn extract(
        &self,
        transcript: &str,
        contract: &ExtractionContract,
    ) -> Result<ProviderOutput, ExtractorError>;

    /// Provider name for logs
    fn name(&self) -> &str;
}
