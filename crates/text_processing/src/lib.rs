//! Text processing for dispatch call transcripts
//!
//! This crate provides the lexical fallback layer used after model-based
//! extraction:
//! - **Classifiers**: pattern-based labels for driver status, emergency
//!   type, call outcome, load security and POD acknowledgment
//! - **Gap filling**: fill only the categorical fields still missing
//!
//! # Example
//!
//! ```ignore
//! use dispatch_agent_text_processing::fill_missing_categorical_fields;
//!
//! let result = fill_missing_categorical_fields(&fields, transcript, ScenarioType::DispatchCheckIn);
//! println!("Filled: {:?}", result.filled);
//! ```

pub mod fallback;

pub use fallback::{
    classify_call_outcome, classify_driver_status, classify_emergency_type, classify_load_secure,
    classify_pod_acknowledged, fill_missing_categorical_fields, FallbackFill, FREE_TEXT_FIELDS,
};
