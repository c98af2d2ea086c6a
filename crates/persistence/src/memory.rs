//! In-memory call store

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use dispatch_agent_core::Utterance;

use crate::records::{AgentConfigRecord, CallRecord, CallUpdate, SummaryRecord, TranscriptRecord};
use crate::store::CallStore;
use crate::PersistenceError;

/// Process-local store for development and tests
#[derive(Default)]
pub struct InMemoryCallStore {
    calls: RwLock<HashMap<String, CallRecord>>,
    transcripts: RwLock<HashMap<String, TranscriptRecord>>,
    summaries: RwLock<HashMap<String, SummaryRecord>>,
    agent_configs: RwLock<HashMap<String, AgentConfigRecord>>,
}

impl InMemoryCallStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary_count(&self) -> usize {
        self.summaries.read().len()
    }
}

#[async_trait]
impl CallStore for InMemoryCallStore {
    async fn get_call(&self, call_id: &str) -> Result<Option<CallRecord>, PersistenceError> {
        Ok(self.calls.read().get(call_id).cloned())
    }

    async fn find_call_by_provider_id(
        &self,
        provider_call_id: &str,
    ) -> Result<Option<CallRecord>, PersistenceError> {
        Ok(self
            .calls
            .read()
            .values()
            .find(|c| c.provider_call_id.as_deref() == Some(provider_call_id))
            .cloned())
    }

    async fn create_call(&self, call: &CallRecord) -> Result<(), PersistenceError> {
        self.calls.write().insert(call.id.clone(), call.clone());
        Ok(())
    }

    async fn update_call(&self, call_id: &str, update: &CallUpdate) -> Result<CallRecord, PersistenceError> {
        let mut calls = self.calls.write();
        let call = calls
            .get_mut(call_id)
            .ok_or_else(|| PersistenceError::CallNotFound(call_id.to_string()))?;
        call.apply(update);
        Ok(call.clone())
    }

    async fn insert_transcript(
        &self,
        call_id: &str,
        raw_transcript: Option<&str>,
        utterances: &[Utterance],
    ) -> Result<TranscriptRecord, PersistenceError> {
        let record = TranscriptRecord::new(call_id, raw_transcript, utterances);
        self.transcripts.write().insert(call_id.to_string(), record.clone());
        Ok(record)
    }

    async fn get_transcript(&self, call_id: &str) -> Result<Option<TranscriptRecord>, PersistenceError> {
        Ok(self.transcripts.read().get(call_id).cloned())
    }

    async fn get_summary(&self, call_id: &str) -> Result<Option<SummaryRecord>, PersistenceError> {
        Ok(self.summaries.read().get(call_id).cloned())
    }

    async fn upsert_summary(&self, mut summary: SummaryRecord) -> Result<SummaryRecord, PersistenceError> {
        let mut summaries = self.summaries.write();
        if let Some(existing) = summaries.get(&summary.call_id) {
            summary.created_at = existing.created_at;
            summary.updated_at = Utc::now();
        }
        summaries.insert(summary.call_id.clone(), summary.clone());
        Ok(summary)
    }

    async fn get_agent_config(&self, id: &str) -> Result<Option<AgentConfigRecord>, PersistenceError> {
        Ok(self.agent_configs.read().get(id).cloned())
    }

    async fn put_agent_config(&self, config: &AgentConfigRecord) -> Result<(), PersistenceError> {
        self.agent_configs.write().insert(config.id.clone(), config.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_agent_core::{FieldMap, ScenarioType};
    use serde_json::json;

    #[tokio::test]
    async fn test_call_lifecycle() {
        let store = InMemoryCallStore::new();
        let call = CallRecord::new("Mike", "LOAD-7");
        store.create_call(&call).await.unwrap();

        assert!(store.find_call_by_provider_id("retell-1").await.unwrap().is_none());

        store
            .update_call(
                &call.id,
                &CallUpdate {
                    provider_call_id: Some("retell-1".into()),
                    ..CallUpdate::default()
                },
            )
            .await
            .unwrap();

        let found = store.find_call_by_provider_id("retell-1").await.unwrap().unwrap();
        assert_eq!(found.id, call.id);
    }

    #[tokio::test]
    async fn test_update_unknown_call() {
        let store = InMemoryCallStore::new();
        let err = store
            .update_call("missing", &CallUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::CallNotFound(_)));
    }

    #[tokio::test]
    async fn test_upsert_summary_overwrites() {
        let store = InMemoryCallStore::new();
        let mut fields = FieldMap::new();
        fields.insert("driver_status".into(), json!("Driving"));

        let first = store
            .upsert_summary(SummaryRecord::new("call-1", fields.clone(), json!({}), true))
            .await
            .unwrap();

        fields.insert("call_outcome".into(), json!("In-Transit Update"));
        let second = store
            .upsert_summary(SummaryRecord::new("call-1", fields.clone(), json!({}), false))
            .await
            .unwrap();

        assert_eq!(store.summary_count(), 1);
        assert_eq!(second.created_at, first.created_at);
        let stored = store.get_summary("call-1").await.unwrap().unwrap();
        assert_eq!(stored.fields, fields);
        assert!(!stored.is_partial);
    }

    #[tokio::test]
    async fn test_agent_config_roundtrip() {
        let store = InMemoryCallStore::new();
        let config = AgentConfigRecord::new("Emergency line", ScenarioType::Emergency, "prompt");
        store.put_agent_config(&config).await.unwrap();

        let loaded = store.get_agent_config(&config.id).await.unwrap().unwrap();
        assert_eq!(loaded.scenario().unwrap(), ScenarioType::Emergency);
    }
}
