//! Per-call conversation context

use serde::{Deserialize, Serialize};

use dispatch_agent_core::{
    DelayReason, DriverStatus, EmergencyType, UnloadingStatus, Utterance,
};

use crate::state::ConversationState;

/// Everything the tracker knows about one call.
///
/// Serializes to the flat snapshot stored on the call record. Every key is
/// optional on the way back in, so snapshots written before a field existed
/// still load.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationContext {
    pub state: ConversationState,

    // Dispatch check-in
    pub driver_status: Option<DriverStatus>,
    pub current_location: Option<String>,
    pub eta: Option<String>,
    pub delay_reason: Option<DelayReason>,
    pub unloading_status: Option<UnloadingStatus>,
    pub pod_acknowledged: Option<bool>,

    // Emergency
    pub is_emergency: bool,
    pub emergency_type: Option<EmergencyType>,
    pub safety_status: Option<String>,
    pub injury_status: Option<String>,
    pub emergency_location: Option<String>,
    pub load_secure: Option<bool>,

    pub uncooperative_count: u32,
    pub repeat_request_count: u32,

    /// Conversation order, append-only
    pub utterances: Vec<Utterance>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
