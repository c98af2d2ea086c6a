//! Prompt Building
//!
//! Constructs the chat prompts used for structured transcript extraction.

use std::fmt;

use serde::{Deserialize, Serialize};

use dispatch_agent_core::{ExtractionContract, FieldKind, ScenarioType};

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

const BASE_SYSTEM_PROMPT: &str = "\
You are an expert at extracting structured information from logistics call transcripts.

CRITICAL REQUIREMENTS:
1. Use EXACT field names from the provided schema (case-sensitive, singular forms)
2. For enum/literal fields, use ONLY the exact values specified - do not create variations
3. Extract only information explicitly stated in the transcript
4. Use null for missing information
5. Do not add fields not in the schema

The schema defines the exact structure you must follow.";

const EMERGENCY_GUIDANCE: &str = "\
For emergency scenarios, focus on:
- emergency_type: Must be exactly one of: \"Accident\", \"Breakdown\", \"Medical\", \"Other\"
- call_outcome: Must be exactly \"Emergency Escalation\"
- escalation_status: Must be exactly \"Connected to Human Dispatcher\"
- load_secure: Boolean (true/false/null)
- safety_status, injury_status, emergency_location: Free-form text or null";

const DISPATCH_GUIDANCE: &str = "\
For dispatch check-in scenarios, focus on:
- call_outcome: Must be exactly one of: \"In-Transit Update\" or \"Arrival Confirmation\"
- driver_status: Must be exactly one of: \"Driving\", \"Delayed\", \"Arrived\", \"Unloading\"
- delay_reason: Must be exactly one of: \"Heavy Traffic\", \"Weather\", \"None\", or null
- unloading_status: Must be exactly one of: \"In Door 42\", \"Waiting for Lumper\", \"Detention\", \"N/A\", or null
- pod_reminder_acknowledged: Boolean (true/false/null)
- current_location, eta: Free-form text or null

IMPORTANT: Use singular field names (e.g., \"delay_reason\" not \"delay_reasons\").";

/// Prompt builder for one extraction contract
pub struct ExtractionPromptBuilder<'a> {
    contract: &'a ExtractionContract,
}

impl<'a> ExtractionPromptBuilder<'a> {
    pub fn new(contract: &'a ExtractionContract) -> Self {
        Self { contract }
    }

    /// Base rules plus the scenario's field guidance
    pub fn system_prompt(&self) -> String {
        let guidance = match self.contract.scenario {
            ScenarioType::Emergency => EMERGENCY_GUIDANCE,
            ScenarioType::DispatchCheckIn => DISPATCH_GUIDANCE,
        };
        format!("{BASE_SYSTEM_PROMPT}\n\n{guidance}")
    }

    /// One line per field with its allowed values
    fn field_instructions(&self) -> Vec<String> {
        self.contract
            .fields
            .iter()
            .map(|spec| {
                let name = format!("\"{}\"", spec.name);
                match spec.kind {
                    FieldKind::OneOf(values) => {
                        let allowed: Vec<String> = values.iter().map(|v| format!("\"{v}\"")).collect();
                        format!("{name} (must be exactly one of: {})", allowed.join(", "))
                    }
                    FieldKind::Fixed(value) => format!("{name} (must be exactly \"{value}\")"),
                    FieldKind::Boolean => format!("{name} (boolean: true, false, or null)"),
                    FieldKind::Text => name,
                }
            })
            .collect()
    }

    pub fn user_prompt(&self, transcript: &str) -> String {
        let required: Vec<String> = self
            .contract
            .required_fields()
            .map(|f| format!("\"{f}\""))
            .collect();
        let fields = self
            .field_instructions()
            .iter()
            .map(|line| format!("- {line}"))
            .collect::<Vec<_>>()
            .join("\n");
        let schema = serde_json::to_string_pretty(&self.contract.json_schema()).unwrap_or_default();

        format!(
            "Extract structured information from the following call transcript.

CRITICAL FIELD NAME REQUIREMENTS:
- Use EXACT field names (case-sensitive, singular forms)
- Do NOT use plural forms (e.g., use \"delay_reason\" NOT \"delay_reasons\")
- Do NOT add fields that are not listed below

Required fields: {required}

All fields and their allowed values:
{fields}

Schema structure:
{schema}

Transcript:
{transcript}

Instructions:
1. Use ONLY the exact field names listed above (singular forms, case-sensitive)
2. For fields with specific allowed values, use ONLY those exact values (no variations)
3. Extract only information explicitly stated in the transcript
4. Use null for fields where no information is available
5. Do not add any fields not in the list above

Return a JSON object using the EXACT field names and values specified above.",
            required = required.join(", "),
        )
    }

    /// System and user messages for one extraction request
    pub fn build(&self, transcript: &str) -> Vec<Message> {
        vec![
            Message::system(self.system_prompt()),
            Message::user(self.user_prompt(transcript)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_per_scenario() {
        let emergency = ExtractionContract::for_scenario(ScenarioType::Emergency);
        let prompt = ExtractionPromptBuilder::new(emergency).system_prompt();
        assert!(prompt.starts_with("You are an expert"));
        assert!(prompt.contains("Connected to Human Dispatcher"));
        assert!(!prompt.contains("driver_status"));

        let dispatch = ExtractionContract::for_scenario(ScenarioType::DispatchCheckIn);
        let prompt = ExtractionPromptBuilder::new(dispatch).system_prompt();
        assert!(prompt.contains("Waiting for Lumper"));
    }

    #[test]
    fn test_user_prompt_lists_fields() {
        let contract = ExtractionContract::for_scenario(ScenarioType::DispatchCheckIn);
        let prompt = ExtractionPromptBuilder::new(contract).user_prompt("Agent: Hi\nUser: Driving");

        assert!(prompt.contains("Required fields: \"call_outcome\", \"driver_status\""));
        assert!(prompt.contains(
            "- \"driver_status\" (must be exactly one of: \"Driving\", \"Delayed\", \"Arrived\", \"Unloading\")"
        ));
        assert!(prompt.contains("- \"pod_reminder_acknowledged\" (boolean: true, false, or null)"));
        assert!(prompt.contains("- \"eta\"\n"));
        assert!(prompt.contains("Transcript:\nAgent: Hi\nUser: Driving"));
    }

    #[test]
    fn test_fixed_fields_rendered() {
        let contract = ExtractionContract::for_scenario(ScenarioType::Emergency);
        let prompt = ExtractionPromptBuilder::new(contract).user_prompt("");
        assert!(prompt.contains("\"escalation_status\" (must be exactly \"Connected to Human Dispatcher\")"));
    }

    #[test]
    fn test_build_roles() {
        let contract = ExtractionContract::for_scenario(ScenarioType::Emergency);
        let messages = ExtractionPromptBuilder::new(contract).build("User: crash");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(serde_json::to_value(&messages[0]).unwrap()["role"], "system");
    }
}
