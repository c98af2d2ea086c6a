//! Persistence layer for the dispatch voice agent
//!
//! Provides storage for:
//! - Call records and their conversation context snapshots
//! - Transcripts
//! - Structured call summaries
//! - Agent configurations (scenario selection)
//!
//! Backed by ScyllaDB in production or an in-memory store for development.

pub mod calls;
pub mod client;
pub mod error;
pub mod memory;
pub mod records;
pub mod schema;
pub mod store;

use std::sync::Arc;

pub use calls::ScyllaCallStore;
pub use client::{ScyllaClient, ScyllaConfig};
pub use error::PersistenceError;
pub use memory::InMemoryCallStore;
pub use records::{
    AgentConfigRecord, CallRecord, CallStatus, CallUpdate, SummaryRecord, TranscriptRecord,
};
pub use store::CallStore;

use dispatch_agent_config::{PersistenceBackend, PersistenceConfig};

/// Connect to ScyllaDB and ensure the schema exists
pub async fn init(config: ScyllaConfig) -> Result<ScyllaCallStore, PersistenceError> {
    let client = ScyllaClient::connect(config).await?;
    client.ensure_schema().await?;
    Ok(ScyllaCallStore::new(client))
}

/// Build the configured store
pub async fn build_store(config: &PersistenceConfig) -> Result<Arc<dyn CallStore>, PersistenceError> {
    match config.backend {
        PersistenceBackend::Memory => {
            tracing::info!("Using in-memory call store");
            Ok(Arc::new(InMemoryCallStore::new()))
        }
        PersistenceBackend::Scylla => Ok(Arc::new(init(ScyllaConfig::from(config)).await?)),
    }
}
