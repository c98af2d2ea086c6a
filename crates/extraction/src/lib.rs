//! Post-call extraction for the dispatch voice agent
//!
//! Turns a finished call transcript into a stored summary in two stages:
//! a structured-extraction provider first, then the lexical fallback for
//! whatever categorical fields are still missing.

pub mod pipeline;
pub mod result;

pub use pipeline::{resolve_scenario, ExtractionPipeline};
pub use result::{ExtractionMethod, ExtractionResult};

use dispatch_agent_persistence::PersistenceError;
use thiserror::Error;

/// Errors raised while loading the inputs of an extraction run.
///
/// A run itself never fails: provider and storage problems degrade into
/// the returned [`ExtractionResult`].
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Call not found: {0}")]
    CallNotFound(String),

    #[error("No transcript stored for call {0}")]
    TranscriptNotFound(String),

    #[error("Cannot resolve scenario for call {call_id}: {reason}")]
    ScenarioUnresolved { call_id: String, reason: String },

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}
