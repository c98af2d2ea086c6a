//! Extraction outcome types

use std::fmt;

use serde::{Deserialize, Serialize};

use dispatch_agent_core::{FieldMap, FieldViolation, ScenarioType};

/// How the final field set was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtractionMethod {
    /// Provider output alone satisfied the contract
    #[serde(rename = "openai")]
    Llm,
    /// Provider call failed and the fallback has not run
    #[serde(rename = "failed_openai")]
    LlmFailed,
    /// Provider yielded nothing usable; every field came from the fallback
    #[serde(rename = "regex_fallback_only")]
    FallbackOnly,
    /// Provider output topped up by the fallback
    #[serde(rename = "openai_with_regex_fallback")]
    LlmWithFallback,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Llm => "openai",
            ExtractionMethod::LlmFailed => "failed_openai",
            ExtractionMethod::FallbackOnly => "regex_fallback_only",
            ExtractionMethod::LlmWithFallback => "openai_with_regex_fallback",
        }
    }

    /// Whether the lexical fallback contributed
    pub fn used_fallback(&self) -> bool {
        matches!(self, ExtractionMethod::FallbackOnly | ExtractionMethod::LlmWithFallback)
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub call_id: String,
    pub scenario: ScenarioType,
    /// Final fields, restricted to the summary columns
    pub fields: FieldMap,
    pub method: ExtractionMethod,
    /// At least one required field is missing from `fields`
    pub partial: bool,
    /// Unrestricted fields plus `_extraction_method` and `_is_partial`
    pub audit: serde_json::Value,
    /// Contract violations found in the provider output
    pub violations: Vec<FieldViolation>,
    /// Fields filled by the fallback, in fill order
    pub fallback_fields: Vec<&'static str>,
    /// False when the summary could not be stored
    pub persisted: bool,
}

impl ExtractionResult {
    pub fn missing_required(&self) -> Vec<&'static str> {
        dispatch_agent_core::ExtractionContract::for_scenario(self.scenario).missing_required(&self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_wire_names() {
        for method in [
            ExtractionMethod::Llm,
            ExtractionMethod::LlmFailed,
            ExtractionMethod::FallbackOnly,
            ExtractionMethod::LlmWithFallback,
        ] {
            let json = serde_json::to_value(method).unwrap();
            assert_eq!(json, serde_json::Value::from(method.as_str()));
        }
    }

    #[test]
    fn test_used_fallback() {
        assert!(!ExtractionMethod::Llm.used_fallback());
        assert!(!ExtractionMethod::LlmFailed.used_fallback());
        assert!(ExtractionMethod::FallbackOnly.used_fallback());
        assert!(ExtractionMethod::LlmWithFallback.used_fallback());
    }
}
