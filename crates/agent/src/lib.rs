//! Conversation State Tracker for dispatch calls
//!
//! Features:
//! - Dialogue states with a closed transition table
//! - Live emergency detection with a force-transition override
//! - Bounded retries for unclear and uncooperative driver answers
//! - Serializable per-call context
//! - Per-call tracker registry for concurrent webhook deliveries

pub mod context;
pub mod edge_cases;
pub mod emergency;
pub mod registry;
pub mod state;
pub mod tracker;

pub use context::ConversationContext;
pub use edge_cases::{
    is_unclear_response, is_uncooperative_response, UnclearOutcome, UncooperativeOutcome,
};
pub use emergency::{detect_emergency, EMERGENCY_KEYWORDS};
pub use registry::{CloseGuard, SharedTracker, TrackerRegistry};
pub use state::ConversationState;
pub use tracker::{StateTracker, TrackerEvent, TurnOutcome};

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Unknown conversation state: {0}")]
    UnknownState(String),

    #[error("Invalid context snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}
