//! Keyspace and table definitions
//!
//! Timestamps are stored as epoch milliseconds (`bigint`), JSON payloads as
//! text.

use scylla::Session;

use crate::PersistenceError;

pub async fn create_keyspace(
    session: &Session,
    keyspace: &str,
    replication_factor: u8,
) -> Result<(), PersistenceError> {
    let query = format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = \
         {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace, replication_factor
    );
    session
        .query_unpaged(query, ())
        .await
        .map_err(|e| PersistenceError::SchemaError(e.to_string()))?;
    Ok(())
}

pub async fn create_tables(session: &Session, keyspace: &str) -> Result<(), PersistenceError> {
    let tables = [
        format!(
            "CREATE TABLE IF NOT EXISTS {}.calls (
                id text PRIMARY KEY,
                driver_name text,
                phone_number text,
                load_number text,
                agent_config_id text,
                provider_call_id text,
                status text,
                started_at bigint,
                ended_at bigint,
                duration_seconds bigint,
                context_json text,
                created_at bigint,
                updated_at bigint
            )",
            keyspace
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {}.calls_by_provider (
                provider_call_id text PRIMARY KEY,
                call_id text
            )",
            keyspace
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {}.transcripts (
                call_id text PRIMARY KEY,
                id text,
                raw_transcript text,
                utterances_json text,
                created_at bigint
            )",
            keyspace
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {}.summaries (
                call_id text PRIMARY KEY,
                fields_json text,
                raw_extraction_json text,
                is_partial boolean,
                created_at bigint,
                updated_at bigint
            )",
            keyspace
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {}.agent_configs (
                id text PRIMARY KEY,
                name text,
                scenario_type text,
                system_prompt text,
                created_at bigint,
                updated_at bigint
            )",
            keyspace
        ),
    ];

    for ddl in tables {
        session
            .query_unpaged(ddl, ())
            .await
            .map_err(|e| PersistenceError::SchemaError(e.to_string()))?;
    }

    tracing::debug!(keyspace, "Tables ensured");
    Ok(())
}
