//! LLM integration for transcript extraction
//!
//! Features:
//! - Chat message types
//! - Scenario-aware extraction prompts
//! - OpenAI-compatible structured-extraction client
//! - A disabled provider for running without a model

pub mod disabled;
pub mod openai;
pub mod prompt;

pub use disabled::DisabledExtractor;
pub use openai::OpenAiExtractor;
pub use prompt::{ExtractionPromptBuilder, Message, Role};

use std::sync::Arc;

use dispatch_agent_config::ExtractionConfig;
use dispatch_agent_core::{ExtractorError, StructuredExtractor};
use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Model returned invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Malformed completion response: {0}")]
    InvalidResponse(String),

    #[error("No API key configured")]
    MissingApiKey,
}

impl From<LlmError> for ExtractorError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Http(e) => ExtractorError::Http(e.to_string()),
            LlmError::Api { status, message } => ExtractorError::Api { status, message },
            LlmError::EmptyResponse => ExtractorError::EmptyResponse,
            LlmError::InvalidJson(msg) | LlmError::InvalidResponse(msg) => {
                ExtractorError::InvalidJson(msg)
            }
            LlmError::MissingApiKey => ExtractorError::NotConfigured("missing api key".to_string()),
        }
    }
}

/// Build the configured provider. Without an API key, extraction runs on
/// the lexical fallback alone.
pub fn build_extractor(config: &ExtractionConfig) -> Result<Arc<dyn StructuredExtractor>, LlmError> {
    match OpenAiExtractor::new(config) {
        Ok(extractor) => {
            tracing::info!(model = %config.model, api_base = %config.api_base, "Structured extraction enabled");
            Ok(Arc::new(extractor))
        }
        Err(LlmError::MissingApiKey) => {
            tracing::warn!("No extraction API key configured, summaries will use the lexical fallback only");
            Ok(Arc::new(DisabledExtractor::new("missing api key")))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_extractor_reports_not_configured() {
        let extractor = DisabledExtractor::new("missing api key");
        let contract = dispatch_agent_core::ExtractionContract::for_scenario(
            dispatch_agent_core::ScenarioType::DispatchCheckIn,
        );
        let err = extractor.extract("hello", contract).await.unwrap_err();
        assert_eq!(err, ExtractorError::NotConfigured("missing api key".to_string()));
    }
}
