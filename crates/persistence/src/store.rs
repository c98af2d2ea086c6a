//! Call store trait

use async_trait::async_trait;

use dispatch_agent_core::Utterance;

use crate::records::{AgentConfigRecord, CallRecord, CallUpdate, SummaryRecord, TranscriptRecord};
use crate::PersistenceError;

/// Storage for calls, transcripts, summaries and agent configs.
/// Everything is keyed by the internal call id.
#[async_trait]
pub trait CallStore: Send + Sync {
    async fn get_call(&self, call_id: &str) -> Result<Option<CallRecord>, PersistenceError>;

    async fn find_call_by_provider_id(
        &self,
        provider_call_id: &str,
    ) -> Result<Option<CallRecord>, PersistenceError>;

    async fn create_call(&self, call: &CallRecord) -> Result<(), PersistenceError>;

    /// Apply a partial update; fails with `CallNotFound` for unknown ids
    async fn update_call(&self, call_id: &str, update: &CallUpdate) -> Result<CallRecord, PersistenceError>;

    async fn insert_transcript(
        &self,
        call_id: &str,
        raw_transcript: Option<&str>,
        utterances: &[Utterance],
    ) -> Result<TranscriptRecord, PersistenceError>;

    async fn get_transcript(&self, call_id: &str) -> Result<Option<TranscriptRecord>, PersistenceError>;

    async fn get_summary(&self, call_id: &str) -> Result<Option<SummaryRecord>, PersistenceError>;

    /// Insert, or overwrite the existing summary for the same call while
    /// keeping its `created_at`
    async fn upsert_summary(&self, summary: SummaryRecord) -> Result<SummaryRecord, PersistenceError>;

    async fn get_agent_config(&self, id: &str) -> Result<Option<AgentConfigRecord>, PersistenceError>;

    async fn put_agent_config(&self, config: &AgentConfigRecord) -> Result<(), PersistenceError>;
}
