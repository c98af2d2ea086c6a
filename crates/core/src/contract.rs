//! Scenario extraction contracts
//!
//! A contract is the fixed output shape the structured-extraction provider is
//! asked to fill for a call. Contracts are declared as field tables so the
//! same definition drives prompt construction, validation and completeness.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::scenario::{
    CallOutcome, DelayReason, DriverStatus, EmergencyType, EscalationStatus, ScenarioType,
    UnloadingStatus,
};
use crate::{field_present, FieldMap};

/// Columns accepted by the summary sink. Anything else stays in the audit blob only.
pub const SUMMARY_FIELDS: &[&str] = &[
    "call_outcome",
    "driver_status",
    "current_location",
    "eta",
    "delay_reason",
    "unloading_status",
    "pod_reminder_acknowledged",
    "emergency_type",
    "safety_status",
    "injury_status",
    "emergency_location",
    "load_secure",
    "escalation_status",
];

/// Value constraint of a contract field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Closed enumeration of strings
    OneOf(&'static [&'static str]),
    /// Single allowed string, filled in when the provider omits it
    Fixed(&'static str),
    /// Tri-state boolean (true / false / null)
    Boolean,
    /// Free text
    Text,
}

impl FieldKind {
    /// Whether the field holds a closed set of values (enum, fixed or boolean)
    pub fn is_categorical(&self) -> bool {
        !matches!(self, FieldKind::Text)
    }
}

/// Contract field definition
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Counts towards completeness
    pub required: bool,
    pub description: &'static str,
}

/// Constraint violation found while validating provider output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Structured output shape for one scenario
#[derive(Debug)]
pub struct ExtractionContract {
    pub scenario: ScenarioType,
    pub title: &'static str,
    pub fields: &'static [FieldSpec],
}

const DISPATCH_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "call_outcome",
        kind: FieldKind::OneOf(&["In-Transit Update", "Arrival Confirmation"]),
        required: true,
        description: "Overall outcome of the check-in call",
    },
    FieldSpec {
        name: "driver_status",
        kind: FieldKind::OneOf(&["Driving", "Delayed", "Arrived", "Unloading"]),
        required: true,
        description: "Current driver status",
    },
    FieldSpec {
        name: "current_location",
        kind: FieldKind::Text,
        required: false,
        description: "Current location description (e.g., 'I-10 near Indio, CA')",
    },
    FieldSpec {
        name: "eta",
        kind: FieldKind::Text,
        required: false,
        description: "Estimated time of arrival (e.g., 'Tomorrow, 8:00 AM')",
    },
    FieldSpec {
        name: "delay_reason",
        kind: FieldKind::OneOf(&["Heavy Traffic", "Weather", "None"]),
        required: false,
        description: "Reason for delay if applicable",
    },
    FieldSpec {
        name: "unloading_status",
        kind: FieldKind::OneOf(&["In Door 42", "Waiting for Lumper", "Detention", "N/A"]),
        required: false,
        description: "Current unloading status",
    },
    FieldSpec {
        name: "pod_reminder_acknowledged",
        kind: FieldKind::Boolean,
        required: false,
        description: "Whether the proof-of-delivery reminder was acknowledged",
    },
];

const EMERGENCY_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "call_outcome",
        kind: FieldKind::Fixed("Emergency Escalation"),
        required: true,
        description: "Overall outcome of the call",
    },
    FieldSpec {
        name: "emergency_type",
        kind: FieldKind::OneOf(&["Accident", "Breakdown", "Medical", "Other"]),
        required: true,
        description: "Kind of emergency reported",
    },
    FieldSpec {
        name: "safety_status",
        kind: FieldKind::Text,
        required: false,
        description: "Safety status description (e.g., 'Driver confirmed everyone is safe')",
    },
    FieldSpec {
        name: "injury_status",
        kind: FieldKind::Text,
        required: false,
        description: "Injury status description (e.g., 'No injuries reported')",
    },
    FieldSpec {
        name: "emergency_location",
        kind: FieldKind::Text,
        required: false,
        description: "Emergency location (e.g., 'I-15 North, Mile Marker 123')",
    },
    FieldSpec {
        name: "load_secure",
        kind: FieldKind::Boolean,
        required: false,
        description: "Whether the load is secure",
    },
    FieldSpec {
        name: "escalation_status",
        kind: FieldKind::Fixed("Connected to Human Dispatcher"),
        required: false,
        description: "Escalation status",
    },
];

static DISPATCH_CHECKIN: ExtractionContract = ExtractionContract {
    scenario: ScenarioType::DispatchCheckIn,
    title: "DispatchCheckInExtraction",
    fields: DISPATCH_FIELDS,
};

static EMERGENCY: ExtractionContract = ExtractionContract {
    scenario: ScenarioType::Emergency,
    title: "EmergencyExtraction",
    fields: EMERGENCY_FIELDS,
};

impl ExtractionContract {
    /// Contract governing the given scenario
    pub fn for_scenario(scenario: ScenarioType) -> &'static ExtractionContract {
        match scenario {
            ScenarioType::DispatchCheckIn => &DISPATCH_CHECKIN,
            ScenarioType::Emergency => &EMERGENCY,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields that must be present for a summary to be complete
    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.required).map(|f| f.name)
    }

    /// All required fields present and non-null
    pub fn is_complete(&self, fields: &FieldMap) -> bool {
        self.required_fields().all(|name| field_present(fields, name))
    }

    /// Required fields still absent from `fields`
    pub fn missing_required(&self, fields: &FieldMap) -> Vec<&'static str> {
        self.required_fields()
            .filter(|name| !field_present(fields, name))
            .collect()
    }

    /// Validate raw provider output against the field constraints.
    ///
    /// On success the returned map holds only contract fields with non-null
    /// values, plus defaults for fixed fields, and deserializes into the
    /// scenario's typed summary. Every violation is collected rather than
    /// stopping at the first.
    pub fn validate(&self, raw: &FieldMap) -> Result<FieldMap, Vec<FieldViolation>> {
        let mut validated = FieldMap::new();
        let mut violations = Vec::new();

        for spec in self.fields {
            let value = raw.get(spec.name).filter(|v| !v.is_null());

            let Some(value) = value else {
                match spec.kind {
                    FieldKind::Fixed(default) => {
                        validated.insert(spec.name.to_string(), Value::from(default));
                    }
                    _ if spec.required => {
                        violations.push(FieldViolation::new(spec.name, "field required"));
                    }
                    _ => {}
                }
                continue;
            };

            match (spec.kind, value) {
                (FieldKind::OneOf(allowed), Value::String(s)) if allowed.contains(&s.as_str()) => {}
                (FieldKind::OneOf(allowed), _) => {
                    violations.push(FieldViolation::new(
                        spec.name,
                        format!("expected one of {:?}, got {}", allowed, value),
                    ));
                    continue;
                }
                (FieldKind::Fixed(expected), Value::String(s)) if s == expected => {}
                (FieldKind::Fixed(expected), _) => {
                    violations.push(FieldViolation::new(
                        spec.name,
                        format!("expected \"{}\", got {}", expected, value),
                    ));
                    continue;
                }
                (FieldKind::Boolean, Value::Bool(_)) => {}
                (FieldKind::Text, Value::String(_)) => {}
                (FieldKind::Boolean, _) => {
                    violations.push(FieldViolation::new(spec.name, format!("expected boolean, got {}", value)));
                    continue;
                }
                (FieldKind::Text, _) => {
                    violations.push(FieldViolation::new(spec.name, format!("expected string, got {}", value)));
                    continue;
                }
            }

            validated.insert(spec.name.to_string(), value.clone());
        }

        if violations.is_empty() {
            if let Err(e) = self.check_typed(&validated) {
                violations.push(FieldViolation::new("_summary", e.to_string()));
            }
        }

        if violations.is_empty() {
            Ok(validated)
        } else {
            Err(violations)
        }
    }

    fn check_typed(&self, fields: &FieldMap) -> Result<(), serde_json::Error> {
        match self.scenario {
            ScenarioType::DispatchCheckIn => DispatchCheckInSummary::from_fields(fields).map(drop),
            ScenarioType::Emergency => EmergencySummary::from_fields(fields).map(drop),
        }
    }

    /// JSON schema rendering used when instructing the provider
    pub fn json_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        for spec in self.fields {
            let property = match spec.kind {
                FieldKind::OneOf(values) => json!({
                    "type": "string",
                    "enum": values,
                    "description": spec.description,
                }),
                FieldKind::Fixed(value) => json!({
                    "const": value,
                    "default": value,
                    "description": spec.description,
                }),
                FieldKind::Boolean => json!({
                    "type": ["boolean", "null"],
                    "description": spec.description,
                }),
                FieldKind::Text => json!({
                    "type": ["string", "null"],
                    "description": spec.description,
                }),
            };
            properties.insert(spec.name.to_string(), property);
        }

        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required && !matches!(f.kind, FieldKind::Fixed(_)))
            .map(|f| f.name)
            .collect();

        json!({
            "title": self.title,
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Typed view of a validated dispatch check-in summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchCheckInSummary {
    pub call_outcome: CallOutcome,
    pub driver_status: DriverStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_reason: Option<DelayReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unloading_status: Option<UnloadingStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_reminder_acknowledged: Option<bool>,
}

fn default_emergency_outcome() -> CallOutcome {
    CallOutcome::EmergencyEscalation
}

/// Typed view of a validated emergency summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencySummary {
    #[serde(default = "default_emergency_outcome")]
    pub call_outcome: CallOutcome,
    pub emergency_type: EmergencyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injury_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_secure: Option<bool>,
    #[serde(default)]
    pub escalation_status: EscalationStatus,
}

impl DispatchCheckInSummary {
    pub fn from_fields(fields: &FieldMap) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(fields.clone()))
    }
}

impl EmergencySummary {
    pub fn from_fields(fields: &FieldMap) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(fields.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(value: Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_required_fields() {
        let dispatch = ExtractionContract::for_scenario(ScenarioType::DispatchCheckIn);
        assert_eq!(dispatch.required_fields().collect::<Vec<_>>(), vec!["call_outcome", "driver_status"]);

        let emergency = ExtractionContract::for_scenario(ScenarioType::Emergency);
        assert_eq!(emergency.required_fields().collect::<Vec<_>>(), vec!["call_outcome", "emergency_type"]);
    }

    #[test]
    fn test_completeness_ignores_null() {
        let contract = ExtractionContract::for_scenario(ScenarioType::DispatchCheckIn);
        let fields = map(json!({"call_outcome": "In-Transit Update", "driver_status": null}));
        assert!(!contract.is_complete(&fields));
        assert_eq!(contract.missing_required(&fields), vec!["driver_status"]);
    }

    #[test]
    fn test_validate_dispatch_drops_unknown_fields() {
        let contract = ExtractionContract::for_scenario(ScenarioType::DispatchCheckIn);
        let raw = map(json!({
            "call_outcome": "Arrival Confirmation",
            "driver_status": "Arrived",
            "eta": null,
            "delay_reasons": "Weather",
        }));

        let validated = contract.validate(&raw).unwrap();
        assert_eq!(validated.len(), 2);
        assert!(!validated.contains_key("delay_reasons"));
        assert!(!validated.contains_key("eta"));

        let typed = DispatchCheckInSummary::from_fields(&validated).unwrap();
        assert_eq!(typed.driver_status, DriverStatus::Arrived);
    }

    #[test]
    fn test_validate_reports_every_violation() {
        let contract = ExtractionContract::for_scenario(ScenarioType::DispatchCheckIn);
        let raw = map(json!({
            "call_outcome": "Emergency Escalation",
            "driver_status": "driving",
            "pod_reminder_acknowledged": "yes",
        }));

        let violations = contract.validate(&raw).unwrap_err();
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["call_outcome", "driver_status", "pod_reminder_acknowledged"]);
    }

    #[test]
    fn test_emergency_fixed_fields_default() {
        let contract = ExtractionContract::for_scenario(ScenarioType::Emergency);
        let raw = map(json!({"emergency_type": "Breakdown", "load_secure": true}));

        let validated = contract.validate(&raw).unwrap();
        assert_eq!(validated["call_outcome"], "Emergency Escalation");
        assert_eq!(validated["escalation_status"], "Connected to Human Dispatcher");

        let typed = EmergencySummary::from_fields(&validated).unwrap();
        assert_eq!(typed.emergency_type, EmergencyType::Breakdown);
        assert_eq!(typed.load_secure, Some(true));
    }

    #[test]
    fn test_emergency_missing_type_is_violation() {
        let contract = ExtractionContract::for_scenario(ScenarioType::Emergency);
        let violations = contract.validate(&FieldMap::new()).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "emergency_type");
    }

    #[test]
    fn test_json_schema_shape() {
        let schema = ExtractionContract::for_scenario(ScenarioType::Emergency).json_schema();
        assert_eq!(schema["required"], json!(["emergency_type"]));
        assert_eq!(schema["properties"]["escalation_status"]["const"], "Connected to Human Dispatcher");
        assert_eq!(schema["properties"]["emergency_type"]["enum"][0], "Accident");
    }

    #[test]
    fn test_contract_fields_are_sink_columns() {
        for scenario in [ScenarioType::DispatchCheckIn, ScenarioType::Emergency] {
            for spec in ExtractionContract::for_scenario(scenario).fields {
                assert!(SUMMARY_FIELDS.contains(&spec.name), "{} not in sink allowlist", spec.name);
            }
        }
    }
}
