//! Call store backed by ScyllaDB

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dispatch_agent_core::Utterance;

use crate::records::{
    AgentConfigRecord, CallRecord, CallStatus, CallUpdate, SummaryRecord, TranscriptRecord,
};
use crate::store::CallStore;
use crate::{PersistenceError, ScyllaClient};

type CallRow = (
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<String>,
    Option<i64>,
    Option<i64>,
);

const CALL_COLUMNS: &str = "id, driver_name, phone_number, load_number, agent_config_id,
    provider_call_id, status, started_at, ended_at, duration_seconds, context_json,
    created_at, updated_at";

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.and_then(DateTime::from_timestamp_millis)
}

fn call_from_row(row: CallRow) -> Result<CallRecord, PersistenceError> {
    let (
        id,
        driver_name,
        phone_number,
        load_number,
        agent_config_id,
        provider_call_id,
        status,
        started_at,
        ended_at,
        duration_seconds,
        context_json,
        created_at,
        updated_at,
    ) = row;

    let status = match status.as_deref() {
        None => CallStatus::Pending,
        Some(s) => CallStatus::parse(s)
            .ok_or_else(|| PersistenceError::InvalidData(format!("unknown call status '{s}'")))?,
    };
    let context = context_json
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()?;

    Ok(CallRecord {
        id,
        driver_name: driver_name.unwrap_or_default(),
        phone_number,
        load_number: load_number.unwrap_or_default(),
        agent_config_id,
        provider_call_id,
        status,
        started_at: from_millis(started_at),
        ended_at: from_millis(ended_at),
        duration_seconds,
        context,
        created_at: from_millis(created_at).unwrap_or_else(Utc::now),
        updated_at: from_millis(updated_at).unwrap_or_else(Utc::now),
    })
}

/// ScyllaDB implementation of the call store
#[derive(Clone)]
pub struct ScyllaCallStore {
    client: ScyllaClient,
}

impl ScyllaCallStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    async fn write_call(&self, call: &CallRecord) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.calls ({CALL_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );
        let context_json = call.context.as_ref().map(serde_json::to_string).transpose()?;

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    &call.id,
                    &call.driver_name,
                    &call.phone_number,
                    &call.load_number,
                    &call.agent_config_id,
                    &call.provider_call_id,
                    call.status.as_str(),
                    call.started_at.map(to_millis),
                    call.ended_at.map(to_millis),
                    call.duration_seconds,
                    context_json,
                    to_millis(call.created_at),
                    to_millis(call.updated_at),
                ),
            )
            .await?;

        if let Some(provider_call_id) = &call.provider_call_id {
            let query = format!(
                "INSERT INTO {}.calls_by_provider (provider_call_id, call_id) VALUES (?, ?)",
                self.client.keyspace()
            );
            self.client
                .session()
                .query_unpaged(query, (provider_call_id, &call.id))
                .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl CallStore for ScyllaCallStore {
    async fn get_call(&self, call_id: &str) -> Result<Option<CallRecord>, PersistenceError> {
        let query = format!(
            "SELECT {CALL_COLUMNS} FROM {}.calls WHERE id = ?",
            self.client.keyspace()
        );
        let result = self.client.session().query_unpaged(query, (call_id,)).await?;

        if let Some(rows) = result.rows {
            if let Some(row) = rows.into_iter().next() {
                let row: CallRow = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
                return call_from_row(row).map(Some);
            }
        }

        Ok(None)
    }

    async fn find_call_by_provider_id(
        &self,
        provider_call_id: &str,
    ) -> Result<Option<CallRecord>, PersistenceError> {
        let query = format!(
            "SELECT call_id FROM {}.calls_by_provider WHERE provider_call_id = ?",
            self.client.keyspace()
        );
        let result = self
            .client
            .session()
            .query_unpaged(query, (provider_call_id,))
            .await?;

        let call_id = match result.rows.and_then(|rows| rows.into_iter().next()) {
            Some(row) => {
                let (call_id,): (String,) = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
                call_id
            }
            None => return Ok(None),
        };

        self.get_call(&call_id).await
    }

    async fn create_call(&self, call: &CallRecord) -> Result<(), PersistenceError> {
        self.write_call(call).await?;
        tracing::debug!(call_id = %call.id, "Call created in ScyllaDB");
        Ok(())
    }

    async fn update_call(&self, call_id: &str, update: &CallUpdate) -> Result<CallRecord, PersistenceError> {
        let mut call = self
            .get_call(call_id)
            .await?
            .ok_or_else(|| PersistenceError::CallNotFound(call_id.to_string()))?;

        call.apply(update);
        self.write_call(&call).await?;

        tracing::debug!(call_id, status = call.status.as_str(), "Call updated in ScyllaDB");
        Ok(call)
    }

    async fn insert_transcript(
        &self,
        call_id: &str,
        raw_transcript: Option<&str>,
        utterances: &[Utterance],
    ) -> Result<TranscriptRecord, PersistenceError> {
        let record = TranscriptRecord::new(call_id, raw_transcript, utterances);
        let query = format!(
            "INSERT INTO {}.transcripts (call_id, id, raw_transcript, utterances_json, created_at)
             VALUES (?, ?, ?, ?, ?)",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    &record.call_id,
                    &record.id,
                    &record.raw_transcript,
                    serde_json::to_string(&record.utterances)?,
                    to_millis(record.created_at),
                ),
            )
            .await?;

        Ok(record)
    }

    async fn get_transcript(&self, call_id: &str) -> Result<Option<TranscriptRecord>, PersistenceError> {
        let query = format!(
            "SELECT call_id, id, raw_transcript, utterances_json, created_at
             FROM {}.transcripts WHERE call_id = ?",
            self.client.keyspace()
        );
        let result = self.client.session().query_unpaged(query, (call_id,)).await?;

        if let Some(row) = result.rows.and_then(|rows| rows.into_iter().next()) {
            let (call_id, id, raw_transcript, utterances_json, created_at): (
                String,
                Option<String>,
                Option<String>,
                Option<String>,
                Option<i64>,
            ) = row
                .into_typed()
                .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

            let utterances = match utterances_json {
                Some(json) => serde_json::from_str(&json)?,
                None => Vec::new(),
            };

            return Ok(Some(TranscriptRecord {
                id: id.unwrap_or_default(),
                call_id,
                raw_transcript,
                utterances,
                created_at: from_millis(created_at).unwrap_or_else(Utc::now),
            }));
        }

        Ok(None)
    }

    async fn get_summary(&self, call_id: &str) -> Result<Option<SummaryRecord>, PersistenceError> {
        let query = format!(
            "SELECT call_id, fields_json, raw_extraction_json, is_partial, created_at, updated_at
             FROM {}.summaries WHERE call_id = ?",
            self.client.keyspace()
        );
        let result = self.client.session().query_unpaged(query, (call_id,)).await?;

        if let Some(row) = result.rows.and_then(|rows| rows.into_iter().next()) {
            let (call_id, fields_json, raw_json, is_partial, created_at, updated_at): (
                String,
                Option<String>,
                Option<String>,
                Option<bool>,
                Option<i64>,
                Option<i64>,
            ) = row
                .into_typed()
                .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

            let fields = match fields_json {
                Some(json) => serde_json::from_str(&json)?,
                None => Default::default(),
            };
            let raw_extraction = match raw_json {
                Some(json) => serde_json::from_str(&json)?,
                None => serde_json::Value::Null,
            };

            return Ok(Some(SummaryRecord {
                call_id,
                fields,
                raw_extraction,
                is_partial: is_partial.unwrap_or(false),
                created_at: from_millis(created_at).unwrap_or_else(Utc::now),
                updated_at: from_millis(updated_at).unwrap_or_else(Utc::now),
            }));
        }

        Ok(None)
    }

    async fn upsert_summary(&self, mut summary: SummaryRecord) -> Result<SummaryRecord, PersistenceError> {
        if let Some(existing) = self.get_summary(&summary.call_id).await? {
            summary.created_at = existing.created_at;
            summary.updated_at = Utc::now();
            tracing::debug!(call_id = %summary.call_id, "Updating existing summary");
        }

        let query = format!(
            "INSERT INTO {}.summaries (call_id, fields_json, raw_extraction_json, is_partial, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    &summary.call_id,
                    serde_json::to_string(&summary.fields)?,
                    serde_json::to_string(&summary.raw_extraction)?,
                    summary.is_partial,
                    to_millis(summary.created_at),
                    to_millis(summary.updated_at),
                ),
            )
            .await?;

        Ok(summary)
    }

    async fn get_agent_config(&self, id: &str) -> Result<Option<AgentConfigRecord>, PersistenceError> {
        let query = format!(
            "SELECT id, name, scenario_type, system_prompt, created_at, updated_at
             FROM {}.agent_configs WHERE id = ?",
            self.client.keyspace()
        );
        let result = self.client.session().query_unpaged(query, (id,)).await?;

        if let Some(row) = result.rows.and_then(|rows| rows.into_iter().next()) {
            let (id, name, scenario_type, system_prompt, created_at, updated_at): (
                String,
                Option<String>,
                Option<String>,
                Option<String>,
                Option<i64>,
                Option<i64>,
            ) = row
                .into_typed()
                .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

            return Ok(Some(AgentConfigRecord {
                id,
                name: name.unwrap_or_default(),
                scenario_type: scenario_type.unwrap_or_default(),
                system_prompt: system_prompt.unwrap_or_default(),
                created_at: from_millis(created_at).unwrap_or_else(Utc::now),
                updated_at: from_millis(updated_at).unwrap_or_else(Utc::now),
            }));
        }

        Ok(None)
    }

    async fn put_agent_config(&self, config: &AgentConfigRecord) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.agent_configs (id, name, scenario_type, system_prompt, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    &config.id,
                    &config.name,
                    &config.scenario_type,
                    &config.system_prompt,
                    to_millis(config.created_at),
                    to_millis(config.updated_at),
                ),
            )
            .await?;

        Ok(())
    }
}
