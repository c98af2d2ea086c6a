//! Webhook payload models
//!
//! The provider nests call fields under `call`; handlers work on the flat
//! shape produced by [`normalize_payload`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use dispatch_agent_core::Utterance;

/// Lifecycle event kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    CallStarted,
    CallEnded,
    CallAnalyzed,
    Unknown(String),
}

impl EventKind {
    pub fn parse(event: &str) -> Self {
        match event {
            "call_started" => EventKind::CallStarted,
            "call_ended" => EventKind::CallEnded,
            "call_analyzed" => EventKind::CallAnalyzed,
            other => EventKind::Unknown(other.to_string()),
        }
    }

    /// Bounded label for metrics
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::CallStarted => "call_started",
            EventKind::CallEnded => "call_ended",
            EventKind::CallAnalyzed => "call_analyzed",
            EventKind::Unknown(_) => "unknown",
        }
    }
}

/// Flattened webhook payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    pub event: String,
    pub call_id: String,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub call_type: Option<String>,
    #[serde(default)]
    pub call_status: Option<String>,
    #[serde(default)]
    pub disconnection_reason: Option<String>,
    #[serde(default)]
    pub start_timestamp: Option<i64>,
    #[serde(default)]
    pub end_timestamp: Option<i64>,
    #[serde(default)]
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub transcript_object: Option<Vec<Utterance>>,
    #[serde(default)]
    pub call_analysis: Option<Value>,
    /// Caller-supplied metadata set when the call was created
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl WebhookPayload {
    pub fn kind(&self) -> EventKind {
        EventKind::parse(&self.event)
    }

    pub fn utterances(&self) -> &[Utterance] {
        self.transcript_object.as_deref().unwrap_or_default()
    }

    /// Raw transcript, if present and not blank
    pub fn transcript_text(&self) -> Option<&str> {
        self.transcript.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn has_transcript(&self) -> bool {
        self.transcript_text().is_some() || !self.utterances().is_empty()
    }

    /// Internal call id we attached when creating the call
    pub fn internal_call_id(&self) -> Option<&str> {
        self.metadata
            .as_ref()?
            .get("internal_call_id")?
            .as_str()
            .filter(|id| !id.is_empty())
    }
}

/// Flatten `{event, call: {...}}` into a single object.
///
/// Payloads that already carry `call_id` at the top level, or have no
/// `call` object, are returned unchanged.
pub fn normalize_payload(payload: Value) -> Value {
    let Value::Object(mut outer) = payload else {
        return payload;
    };

    if outer.contains_key("call_id") {
        return Value::Object(outer);
    }

    match outer.remove("call") {
        Some(Value::Object(mut call)) => {
            if let Some(event) = outer.remove("event") {
                call.insert("event".to_string(), event);
            }
            Value::Object(call)
        }
        Some(other) => {
            outer.insert("call".to_string(), other);
            Value::Object(outer)
        }
        None => Value::Object(outer),
    }
}

/// Standard webhook response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}
