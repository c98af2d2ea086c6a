//! Dialogue states for a dispatch call
//!
//! The transition table is closed: every state lists its allowed
//! destinations, and `completed`/`failed` have none.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::AgentError;

/// Conversation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// Call connected, nothing asked yet
    #[default]
    Initial,
    /// Asking the driver for a status update
    GatheringStatus,
    /// Driver is on the road
    InTransit,
    /// Driver has reached the destination
    Arrived,
    /// Call finished normally
    Completed,
    /// Emergency keywords heard on the call
    EmergencyDetected,
    /// Handed off to a human dispatcher
    Escalation,
    /// Call could not be completed
    Failed,
}

impl ConversationState {
    pub const ALL: [ConversationState; 8] = [
        ConversationState::Initial,
        ConversationState::GatheringStatus,
        ConversationState::InTransit,
        ConversationState::Arrived,
        ConversationState::Completed,
        ConversationState::EmergencyDetected,
        ConversationState::Escalation,
        ConversationState::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationState::Initial => "initial",
            ConversationState::GatheringStatus => "gathering_status",
            ConversationState::InTransit => "in_transit",
            ConversationState::Arrived => "arrived",
            ConversationState::Completed => "completed",
            ConversationState::EmergencyDetected => "emergency_detected",
            ConversationState::Escalation => "escalation",
            ConversationState::Failed => "failed",
        }
    }

    /// Get all valid transitions from this state
    pub fn valid_transitions(&self) -> &'static [ConversationState] {
        use ConversationState::*;
        match self {
            Initial => &[GatheringStatus, EmergencyDetected],
            GatheringStatus => &[InTransit, Arrived, EmergencyDetected, Failed],
            InTransit => &[Completed, EmergencyDetected],
            Arrived => &[Completed, EmergencyDetected],
            EmergencyDetected => &[Escalation],
            Escalation => &[Completed],
            Completed | Failed => &[],
        }
    }

    pub fn can_transition_to(&self, to: ConversationState) -> bool {
        self.valid_transitions().contains(&to)
    }

    /// `completed` and `failed` end the conversation
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConversationState::Completed | ConversationState::Failed)
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationState {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConversationState::ALL
            .iter()
            .copied()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| AgentError::UnknownState(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_have_no_transitions() {
        for state in ConversationState::ALL {
            assert_eq!(state.is_terminal(), state.valid_transitions().is_empty());
        }
    }

    #[test]
    fn test_transition_table() {
        assert!(ConversationState::Initial.can_transition_to(ConversationState::GatheringStatus));
        assert!(ConversationState::GatheringStatus.can_transition_to(ConversationState::Failed));
        assert!(ConversationState::Escalation.can_transition_to(ConversationState::Completed));
        assert!(!ConversationState::Initial.can_transition_to(ConversationState::Completed));
        assert!(!ConversationState::InTransit.can_transition_to(ConversationState::Arrived));
        assert!(!ConversationState::EmergencyDetected.can_transition_to(ConversationState::Completed));
    }

    #[test]
    fn test_parse_roundtrip() {
        for state in ConversationState::ALL {
            assert_eq!(state.as_str().parse::<ConversationState>().unwrap(), state);
        }
        assert!("gathering".parse::<ConversationState>().is_err());
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&ConversationState::EmergencyDetected).unwrap();
        assert_eq!(json, "\"emergency_detected\"");
    }
}
