//! Core traits and types for the dispatch voice agent
//!
//! This crate provides foundational types used across all other crates:
//! - Scenario and categorical field types
//! - Transcript utterances
//! - Scenario extraction contracts
//! - The structured-extraction provider trait
//! - Error types

pub mod contract;
pub mod error;
pub mod scenario;
pub mod traits;
pub mod transcript;

pub use contract::{
    ExtractionContract, FieldKind, FieldSpec, FieldViolation, DispatchCheckInSummary,
    EmergencySummary, SUMMARY_FIELDS,
};
pub use error::{Error, Result};
pub use scenario::{
    CallOutcome, DelayReason, DriverStatus, EmergencyType, EscalationStatus, ScenarioType,
    UnloadingStatus,
};
pub use traits::{ExtractorError, ProviderOutput, StructuredExtractor};
pub use transcript::{Utterance, UtteranceRole};

/// Field name -> JSON value mapping used for extracted summaries.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// True when `key` is present in `fields` and not JSON null.
pub fn field_present(fields: &FieldMap, key: &str) -> bool {
    fields.get(key).map(|v| !v.is_null()).unwrap_or(false)
}
