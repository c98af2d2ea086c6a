//! Transcript types for call conversations

use std::fmt;

use serde::{Deserialize, Serialize};

/// Speaker of an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UtteranceRole {
    /// The automated voice agent
    Agent,
    /// The driver on the call
    User,
}

impl UtteranceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UtteranceRole::Agent => "agent",
            UtteranceRole::User => "user",
        }
    }
}

impl fmt::Display for UtteranceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single utterance in a call transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub role: UtteranceRole,
    pub content: String,
}

impl Utterance {
    pub fn new(role: UtteranceRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(UtteranceRole::Agent, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(UtteranceRole::User, content)
    }

    /// Check if utterance is empty
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Render utterances as a plain `Role: text` transcript
pub fn render_transcript(utterances: &[Utterance]) -> String {
    utterances
        .iter()
        .map(|u| {
            let speaker = match u.role {
                UtteranceRole::Agent => "Agent",
                UtteranceRole::User => "User",
            };
            format!("{}: {}", speaker, u.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_format() {
        let u: Utterance = serde_json::from_str(r#"{"role":"user","content":"hi"}"#).unwrap();
        assert_eq!(u.role, UtteranceRole::User);
        assert_eq!(serde_json::to_value(UtteranceRole::Agent).unwrap(), "agent");
    }

    #[test]
    fn test_render_transcript() {
        let text = render_transcript(&[
            Utterance::agent("Where are you?"),
            Utterance::user("On I-10"),
        ]);
        assert_eq!(text, "Agent: Where are you?\nUser: On I-10");
    }
}
