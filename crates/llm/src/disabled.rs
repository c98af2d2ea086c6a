//! Stand-in provider used when no model is configured

use async_trait::async_trait;

use dispatch_agent_core::{ExtractionContract, ExtractorError, ProviderOutput, StructuredExtractor};

/// Fails every call with `NotConfigured`, leaving extraction to the fallback
#[derive(Debug, Clone)]
pub struct DisabledExtractor {
    reason: String,
}

impl DisabledExtractor {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl StructuredExtractor for DisabledExtractor {
    async fn extract(
        &self,
        _transcript: &str,
        _contract: &ExtractionContract,
    ) -> Result<ProviderOutput, ExtractorError> {
        Err(ExtractorError::NotConfigured(self.reason.clone()))
    }

    fn name(&self) -> &str {
        "disabled"
    }
}
