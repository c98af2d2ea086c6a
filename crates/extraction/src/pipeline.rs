//! Two-stage extraction pipeline
//!
//! 1. Structured-extraction provider, validated against the scenario contract
//! 2. Lexical fallback for categorical fields the provider left empty
//!
//! The result is restricted to the summary columns and upserted by call id.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use dispatch_agent_core::transcript::render_transcript;
use dispatch_agent_core::{
    field_present, ExtractionContract, FieldMap, ScenarioType, StructuredExtractor, SUMMARY_FIELDS,
};
use dispatch_agent_persistence::{CallRecord, CallStore, SummaryRecord};
use dispatch_agent_text_processing::fill_missing_categorical_fields;

use crate::{ExtractionError, ExtractionMethod, ExtractionResult};

/// Post-call extraction pipeline
pub struct ExtractionPipeline {
    extractor: Arc<dyn StructuredExtractor>,
    store: Arc<dyn CallStore>,
}

impl ExtractionPipeline {
    pub fn new(extractor: Arc<dyn StructuredExtractor>, store: Arc<dyn CallStore>) -> Self {
        Self { extractor, store }
    }

    pub fn store(&self) -> &Arc<dyn CallStore> {
        &self.store
    }

    /// Extract, fill gaps, and store the summary for one call.
    ///
    /// Never fails. Provider errors downgrade to fallback-only extraction,
    /// storage errors leave `persisted == false`. Running it again for the
    /// same call overwrites the stored summary.
    pub async fn process(&self, call_id: &str, transcript: &str, scenario: ScenarioType) -> ExtractionResult {
        let started = Instant::now();
        let contract = ExtractionContract::for_scenario(scenario);

        tracing::info!(
            call_id,
            scenario = %scenario,
            provider = self.extractor.name(),
            transcript_len = transcript.len(),
            "Starting extraction"
        );

        let mut method = ExtractionMethod::Llm;
        let mut violations = Vec::new();

        let mut fields = match self.extractor.extract(transcript, contract).await {
            Ok(output) => match contract.validate(&output.fields) {
                Ok(validated) => validated,
                Err(errors) => {
                    tracing::warn!(
                        call_id,
                        violations = ?errors,
                        "Provider output failed validation, keeping raw fields"
                    );
                    violations = errors;
                    output.fields
                }
            },
            Err(e) => {
                tracing::warn!(call_id, error = %e, "Structured extraction failed, using fallback only");
                method = ExtractionMethod::LlmFailed;
                FieldMap::new()
            }
        };

        let provider_usable = method != ExtractionMethod::LlmFailed
            && contract.fields.iter().any(|f| field_present(&fields, f.name));

        let mut fallback_fields = Vec::new();
        if !contract.is_complete(&fields) {
            let fill = fill_missing_categorical_fields(&fields, transcript, scenario);
            fields = fill.fields;
            fallback_fields = fill.filled;
            method = if provider_usable {
                ExtractionMethod::LlmWithFallback
            } else {
                ExtractionMethod::FallbackOnly
            };
        }

        let partial = !contract.is_complete(&fields);
        let summary_fields = restrict_to_summary_fields(&fields);
        let audit = audit_record(fields, method, partial);

        if partial {
            tracing::warn!(
                call_id,
                missing = ?contract.missing_required(&summary_fields),
                "Summary is partial"
            );
            metrics::counter!("dispatch_agent_partial_summaries_total").increment(1);
        }

        let record = SummaryRecord::new(call_id, summary_fields.clone(), audit.clone(), partial);
        let persisted = match self.store.upsert_summary(record).await {
            Ok(_) => {
                tracing::info!(
                    call_id,
                    method = %method,
                    fallback = method.used_fallback(),
                    partial,
                    "Stored call summary"
                );
                true
            }
            Err(e) => {
                tracing::error!(call_id, error = %e, "Failed to store call summary");
                metrics::counter!("dispatch_agent_persistence_failures_total").increment(1);
                false
            }
        };

        metrics::counter!("dispatch_agent_extractions_total", "method" => method.as_str()).increment(1);
        metrics::histogram!("dispatch_agent_extraction_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        ExtractionResult {
            call_id: call_id.to_string(),
            scenario,
            fields: summary_fields,
            method,
            partial,
            audit,
            violations,
            fallback_fields,
            persisted,
        }
    }

    /// Re-run extraction for a stored call from its saved transcript
    pub async fn reprocess(&self, call_id: &str) -> Result<ExtractionResult, ExtractionError> {
        let call = self
            .store
            .get_call(call_id)
            .await?
            .ok_or_else(|| ExtractionError::CallNotFound(call_id.to_string()))?;
        let scenario = resolve_scenario(self.store.as_ref(), &call).await?;

        let stored = self
            .store
            .get_transcript(call_id)
            .await?
            .ok_or_else(|| ExtractionError::TranscriptNotFound(call_id.to_string()))?;

        let transcript = match stored.raw_transcript {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ if !stored.utterances.is_empty() => render_transcript(&stored.utterances),
            _ => return Err(ExtractionError::TranscriptNotFound(call_id.to_string())),
        };

        Ok(self.process(call_id, &transcript, scenario).await)
    }
}

/// Scenario of a call, taken strictly from its agent configuration
pub async fn resolve_scenario(store: &dyn CallStore, call: &CallRecord) -> Result<ScenarioType, ExtractionError> {
    let unresolved = |reason: String| ExtractionError::ScenarioUnresolved {
        call_id: call.id.clone(),
        reason,
    };

    let config_id = call
        .agent_config_id
        .as_deref()
        .ok_or_else(|| unresolved("call has no agent config".to_string()))?;

    let config = store
        .get_agent_config(config_id)
        .await?
        .ok_or_else(|| unresolved(format!("agent config {} not found", config_id)))?;

    config.scenario().map_err(|e| unresolved(e.to_string()))
}

/// Keep only summary columns with non-null values
fn restrict_to_summary_fields(fields: &FieldMap) -> FieldMap {
    fields
        .iter()
        .filter(|(key, value)| SUMMARY_FIELDS.contains(&key.as_str()) && !value.is_null())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn audit_record(mut fields: FieldMap, method: ExtractionMethod, partial: bool) -> Value {
    fields.insert("_extraction_method".to_string(), Value::from(method.as_str()));
    fields.insert("_is_partial".to_string(), Value::Bool(partial));
    Value::Object(fields)
}
