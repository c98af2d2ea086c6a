//! Deterministic fallback for categorical summary fields
//!
//! Runs after model-based extraction and fills only fields that are still
//! missing. Free-text fields are never touched.

mod classifiers;
mod patterns;

pub use classifiers::{
    classify_call_outcome, classify_driver_status, classify_emergency_type,
    classify_load_secure, classify_pod_acknowledged,
};

use serde_json::Value;

use dispatch_agent_core::{FieldMap, ScenarioType};

/// Fields the fallback layer never populates
pub const FREE_TEXT_FIELDS: [&str; 5] = [
    "current_location",
    "eta",
    "safety_status",
    "injury_status",
    "emergency_location",
];

/// Fallback output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FallbackFill {
    /// Input fields plus whatever the classifiers filled
    pub fields: FieldMap,
    /// Keys filled by the fallback, in fill order
    pub filled: Vec<&'static str>,
}

impl FallbackFill {
    pub fn is_empty(&self) -> bool {
        self.filled.is_empty()
    }
}

/// Categorical fields count as missing when absent or falsy (null, empty
/// string, `false`, zero, empty collection).
fn categorical_missing(fields: &FieldMap, key: &str) -> bool {
    match fields.get(key) {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
    }
}

/// Boolean fields are missing only when absent or null; `false` is an answer.
fn boolean_missing(fields: &FieldMap, key: &str) -> bool {
    matches!(fields.get(key), None | Some(Value::Null))
}

/// Fill missing categorical fields for `scenario` from the transcript.
///
/// Emergency calls: `emergency_type`, `call_outcome`, `load_secure`.
/// Dispatch calls: `driver_status`, `call_outcome`, `pod_reminder_acknowledged`.
pub fn fill_missing_categorical_fields(
    fields: &FieldMap,
    transcript: &str,
    scenario: ScenarioType,
) -> FallbackFill {
    let mut out = FallbackFill {
        fields: fields.clone(),
        filled: Vec::new(),
    };

    let mut fill = |key: &'static str, value: Option<Value>| {
        if let Some(value) = value {
            tracing::debug!(field = key, value = %value, "Fallback filled field");
            out.fields.insert(key.to_string(), value);
            out.filled.push(key);
        }
    };

    match scenario {
        ScenarioType::Emergency => {
            if categorical_missing(fields, "emergency_type") {
                fill(
                    "emergency_type",
                    classify_emergency_type(transcript).map(|t| Value::from(t.as_str())),
                );
            }
            if categorical_missing(fields, "call_outcome") {
                fill(
                    "call_outcome",
                    classify_call_outcome(transcript, scenario).map(|o| Value::from(o.as_str())),
                );
            }
            if boolean_missing(fields, "load_secure") {
                fill("load_secure", classify_load_secure(transcript).map(Value::Bool));
            }
        }
        ScenarioType::DispatchCheckIn => {
            if categorical_missing(fields, "driver_status") {
                fill(
                    "driver_status",
                    classify_driver_status(transcript).map(|s| Value::from(s.as_str())),
                );
            }
            if categorical_missing(fields, "call_outcome") {
                fill(
                    "call_outcome",
                    classify_call_outcome(transcript, scenario).map(|o| Value::from(o.as_str())),
                );
            }
            if boolean_missing(fields, "pod_reminder_acknowledged") {
                fill(
                    "pod_reminder_acknowledged",
                    classify_pod_acknowledged(transcript).map(Value::Bool),
                );
            }
        }
    }

    out
}
