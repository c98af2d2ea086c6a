//! Stored record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dispatch_agent_core::{FieldMap, ScenarioType, Utterance};

use crate::PersistenceError;

/// Call lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Pending => "pending",
            CallStatus::InProgress => "in_progress",
            CallStatus::Completed => "completed",
            CallStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(CallStatus::Pending),
            "in_progress" => Some(CallStatus::InProgress),
            "completed" => Some(CallStatus::Completed),
            "failed" => Some(CallStatus::Failed),
            _ => None,
        }
    }
}

/// One outbound call to a driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Internal id, passed to the voice provider as `internal_call_id` metadata
    pub id: String,
    pub driver_name: String,
    pub phone_number: Option<String>,
    pub load_number: String,
    pub agent_config_id: Option<String>,
    /// Voice provider's call id, known once the call starts
    pub provider_call_id: Option<String>,
    pub status: CallStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    /// Conversation context snapshot written when the call ends
    pub context: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CallRecord {
    pub fn new(driver_name: impl Into<String>, load_number: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            driver_name: driver_name.into(),
            phone_number: None,
            load_number: load_number.into(),
            agent_config_id: None,
            provider_call_id: None,
            status: CallStatus::Pending,
            started_at: None,
            ended_at: None,
            duration_seconds: None,
            context: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_agent_config(mut self, agent_config_id: impl Into<String>) -> Self {
        self.agent_config_id = Some(agent_config_id.into());
        self
    }

    pub fn with_phone_number(mut self, phone_number: impl Into<String>) -> Self {
        self.phone_number = Some(phone_number.into());
        self
    }

    /// Apply the set fields of `update` and bump `updated_at`
    pub fn apply(&mut self, update: &CallUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(id) = &update.provider_call_id {
            self.provider_call_id = Some(id.clone());
        }
        if let Some(at) = update.started_at {
            self.started_at = Some(at);
        }
        if let Some(at) = update.ended_at {
            self.ended_at = Some(at);
        }
        if let Some(secs) = update.duration_seconds {
            self.duration_seconds = Some(secs);
        }
        if let Some(context) = &update.context {
            self.context = Some(context.clone());
        }
        self.updated_at = Utc::now();
    }
}

/// Partial call update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallUpdate {
    pub status: Option<CallStatus>,
    pub provider_call_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub context: Option<serde_json::Value>,
}

impl CallUpdate {
    pub fn status(status: CallStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// Stored call transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub id: String,
    pub call_id: String,
    pub raw_transcript: Option<String>,
    pub utterances: Vec<Utterance>,
    pub created_at: DateTime<Utc>,
}

impl TranscriptRecord {
    pub fn new(call_id: &str, raw_transcript: Option<&str>, utterances: &[Utterance]) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            call_id: call_id.to_string(),
            raw_transcript: raw_transcript.map(str::to_string),
            utterances: utterances.to_vec(),
            created_at: Utc::now(),
        }
    }
}

/// Structured summary, one per call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub call_id: String,
    /// Allowlisted summary fields
    pub fields: FieldMap,
    /// Unrestricted extraction output plus method and partial markers
    pub raw_extraction: serde_json::Value,
    pub is_partial: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SummaryRecord {
    pub fn new(
        call_id: impl Into<String>,
        fields: FieldMap,
        raw_extraction: serde_json::Value,
        is_partial: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            call_id: call_id.into(),
            fields,
            raw_extraction,
            is_partial,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Agent configuration; decides the call's scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfigRecord {
    pub id: String,
    pub name: String,
    /// Stored as written; parsed on use so unknown values surface as errors
    pub scenario_type: String,
    pub system_prompt: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentConfigRecord {
    pub fn new(name: impl Into<String>, scenario: ScenarioType, system_prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            scenario_type: scenario.as_str().to_string(),
            system_prompt: system_prompt.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn scenario(&self) -> Result<ScenarioType, PersistenceError> {
        self.scenario_type
            .parse()
            .map_err(|_| PersistenceError::InvalidData(format!("unknown scenario type '{}'", self.scenario_type)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_apply_update() {
        let mut call = CallRecord::new("Mike", "LOAD-7");
        let before = call.updated_at;

        call.apply(&CallUpdate {
            status: Some(CallStatus::InProgress),
            provider_call_id: Some("retell-1".into()),
            ..CallUpdate::default()
        });
        assert_eq!(call.status, CallStatus::InProgress);
        assert_eq!(call.provider_call_id.as_deref(), Some("retell-1"));
        assert!(call.updated_at >= before);

        call.apply(&CallUpdate::status(CallStatus::Completed));
        assert_eq!(call.provider_call_id.as_deref(), Some("retell-1"));
        assert_eq!(call.status, CallStatus::Completed);
    }

    #[test]
    fn test_status_strings() {
        for status in [CallStatus::Pending, CallStatus::InProgress, CallStatus::Completed, CallStatus::Failed] {
            assert_eq!(CallStatus::parse(status.as_str()), Some(status));
            assert_eq!(serde_json::to_value(status).unwrap(), json!(status.as_str()));
        }
    }

    #[test]
    fn test_agent_config_scenario() {
        let config = AgentConfigRecord::new("Check-in", ScenarioType::DispatchCheckIn, "prompt");
        assert_eq!(config.scenario().unwrap(), ScenarioType::DispatchCheckIn);

        let bad = AgentConfigRecord {
            scenario_type: "sales".into(),
            ..config
        };
        assert!(bad.scenario().is_err());
    }
}
