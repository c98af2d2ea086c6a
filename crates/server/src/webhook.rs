//! Call-lifecycle webhook handling
//!
//! - `call_started`: link the provider call to our call record
//! - `call_ended`: close the record, store the transcript, replay it
//!   through the conversation tracker for emergency detection
//! - `call_analyzed`: queue structured extraction

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use chrono::Utc;
use serde_json::{json, Value};

use dispatch_agent_agent::{ConversationContext, StateTracker, TurnOutcome};
use dispatch_agent_config::TrackerConfig;
use dispatch_agent_core::{EmergencyType, FieldMap, ScenarioType, UtteranceRole};
use dispatch_agent_extraction::{resolve_scenario, ExtractionError};
use dispatch_agent_persistence::{CallRecord, CallStatus, CallStore, CallUpdate, PersistenceError};

use crate::payload::{normalize_payload, EventKind, WebhookPayload, WebhookResponse};
use crate::state::AppState;
use crate::{signature, ServerError};

/// Result of handling one event
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Started {
        call_id: String,
        internal_call_id: Option<String>,
    },
    Ended {
        call_id: String,
        internal_call_id: String,
        transcript_stored: bool,
        emergency: Option<EmergencyType>,
    },
    Analyzed {
        call_id: String,
        internal_call_id: String,
        scenario: ScenarioType,
        analysis_received: bool,
        post_processing_queued: bool,
    },
    /// No call record matches the provider call id
    NoRecord { call_id: String },
    /// Repeated `call_ended` for a call that was already closed
    Duplicate {
        call_id: String,
        internal_call_id: String,
    },
    /// The event could not be processed, e.g. no scenario for the call
    Failed { call_id: String, message: String },
    Unhandled { event: String },
}

impl EventOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            EventOutcome::Started { .. } | EventOutcome::Ended { .. } | EventOutcome::Analyzed { .. } => {
                "processed"
            }
            EventOutcome::NoRecord { .. } => "no_record",
            EventOutcome::Duplicate { .. } => "duplicate",
            EventOutcome::Failed { .. } => "error",
            EventOutcome::Unhandled { .. } => "unknown_event",
        }
    }

    /// Response `data` object
    pub fn to_data(&self) -> Value {
        let status = self.status();
        match self {
            EventOutcome::Started {
                call_id,
                internal_call_id,
            } => json!({
                "status": status,
                "call_id": call_id,
                "internal_call_id": internal_call_id,
            }),
            EventOutcome::Ended {
                call_id,
                internal_call_id,
                transcript_stored,
                emergency,
            } => json!({
                "status": status,
                "call_id": call_id,
                "internal_call_id": internal_call_id,
                "transcript_stored": transcript_stored,
                "emergency_detected": emergency.is_some(),
                "emergency_type": emergency.map(|t| t.as_str()),
            }),
            EventOutcome::Analyzed {
                call_id,
                internal_call_id,
                scenario,
                analysis_received,
                post_processing_queued,
            } => json!({
                "status": status,
                "call_id": call_id,
                "internal_call_id": internal_call_id,
                "scenario_type": scenario.as_str(),
                "analysis_received": analysis_received,
                "post_processing_queued": post_processing_queued,
            }),
            EventOutcome::NoRecord { call_id } => json!({ "status": status, "call_id": call_id }),
            EventOutcome::Duplicate {
                call_id,
                internal_call_id,
            } => json!({
                "status": status,
                "call_id": call_id,
                "internal_call_id": internal_call_id,
            }),
            EventOutcome::Failed { call_id, message } => json!({
                "status": status,
                "call_id": call_id,
                "message": message,
            }),
            EventOutcome::Unhandled { event } => json!({ "status": status, "event": event }),
        }
    }
}

/// `POST {webhook_path}`
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ServerError> {
    verify_signature(&state, &headers, &body)?;

    let raw: Value = serde_json::from_slice(&body)
        .map_err(|e| ServerError::InvalidRequest(format!("invalid JSON payload: {}", e)))?;
    let payload: WebhookPayload = serde_json::from_value(normalize_payload(raw))
        .map_err(|e| ServerError::InvalidRequest(format!("invalid webhook payload: {}", e)))?;

    let kind = payload.kind();
    tracing::info!(event = %payload.event, call_id = %payload.call_id, "Received webhook");
    crate::metrics::record_webhook_event(kind.label());

    let outcome = dispatch(&state, kind, &payload).await?;

    Ok(Json(WebhookResponse {
        success: true,
        message: format!("Processed {} event", payload.event),
        data: Some(outcome.to_data()),
    }))
}

/// Route an event to its handler
pub async fn dispatch(state: &AppState, kind: EventKind, payload: &WebhookPayload) -> Result<EventOutcome, ServerError> {
    match kind {
        EventKind::CallStarted => handle_call_started(state, payload).await,
        EventKind::CallEnded => handle_call_ended(state, payload).await,
        EventKind::CallAnalyzed => handle_call_analyzed(state, payload).await,
        EventKind::Unknown(event) => {
            tracing::warn!(event = %event, "Unknown webhook event type");
            Ok(EventOutcome::Unhandled { event })
        }
    }
}

fn verify_signature(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<(), ServerError> {
    let Some(secret) = state.webhook_secret() else {
        return Ok(());
    };

    let header = state.settings.webhook.signature_header.as_str();
    let provided = headers
        .get(header)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServerError::Auth(format!("missing {} header", header)))?;

    if signature::verify(body, provided, secret) {
        Ok(())
    } else {
        Err(ServerError::Auth("invalid webhook signature".to_string()))
    }
}

async fn find_call(state: &AppState, provider_call_id: &str) -> Result<Option<CallRecord>, ServerError> {
    let call = state.store.find_call_by_provider_id(provider_call_id).await?;
    if call.is_none() {
        tracing::warn!(call_id = %provider_call_id, "No call record for provider call id");
    }
    Ok(call)
}

async fn handle_call_started(state: &AppState, payload: &WebhookPayload) -> Result<EventOutcome, ServerError> {
    let Some(internal_id) = payload.internal_call_id() else {
        tracing::warn!(call_id = %payload.call_id, "No internal_call_id in call metadata");
        return Ok(EventOutcome::Started {
            call_id: payload.call_id.clone(),
            internal_call_id: None,
        });
    };

    let update = CallUpdate {
        status: Some(CallStatus::InProgress),
        provider_call_id: Some(payload.call_id.clone()),
        started_at: Some(Utc::now()),
        ..CallUpdate::default()
    };
    match state.store.update_call(internal_id, &update).await {
        Ok(_) => {}
        Err(PersistenceError::CallNotFound(_)) => {
            tracing::warn!(call_id = %payload.call_id, internal_call_id = internal_id, "Unknown internal call id");
            return Ok(EventOutcome::NoRecord {
                call_id: payload.call_id.clone(),
            });
        }
        Err(e) => return Err(e.into()),
    }
    state.trackers.open(internal_id);

    tracing::info!(call_id = %payload.call_id, internal_call_id = internal_id, "Call in progress");
    Ok(EventOutcome::Started {
        call_id: payload.call_id.clone(),
        internal_call_id: Some(internal_id.to_string()),
    })
}

async fn handle_call_ended(state: &AppState, payload: &WebhookPayload) -> Result<EventOutcome, ServerError> {
    let Some(call) = find_call(state, &payload.call_id).await? else {
        return Ok(EventOutcome::NoRecord {
            call_id: payload.call_id.clone(),
        });
    };

    // held until both writes succeed; an error drops it and leaves the call open
    let guard = match state.trackers.begin_close(&call.id) {
        Some(guard) if call.status != CallStatus::Completed => guard,
        _ => {
            tracing::info!(call_id = %payload.call_id, internal_call_id = %call.id, "Duplicate call_ended ignored");
            return Ok(EventOutcome::Duplicate {
                call_id: payload.call_id.clone(),
                internal_call_id: call.id,
            });
        }
    };

    let (emergency, snapshot) = replay_conversation(state, &call, payload)?;
    if let Some(emergency_type) = emergency {
        tracing::warn!(
            call_id = %call.id,
            emergency_type = %emergency_type,
            "Emergency detected in call transcript"
        );
    }

    let transcript_stored = if payload.has_transcript() {
        state
            .store
            .insert_transcript(&call.id, payload.transcript_text(), payload.utterances())
            .await?;
        tracing::info!(call_id = %call.id, utterances = payload.utterances().len(), "Stored transcript");
        true
    } else {
        false
    };

    let update = CallUpdate {
        status: Some(CallStatus::Completed),
        ended_at: Some(Utc::now()),
        duration_seconds: payload.duration_ms.map(|ms| ms / 1000),
        context: Some(snapshot),
        ..CallUpdate::default()
    };
    state.store.update_call(&call.id, &update).await?;
    guard.commit();

    if let Some(emergency_type) = emergency {
        crate::metrics::record_emergency(emergency_type);
    }

    Ok(EventOutcome::Ended {
        call_id: payload.call_id.clone(),
        internal_call_id: call.id,
        transcript_stored,
        emergency,
    })
}

/// Feed the driver's side of the call through a copy of the call's tracker.
/// Returns the detected emergency, if any, with the final context snapshot.
/// The shared tracker is left untouched so a failed delivery can be replayed.
fn replay_conversation(
    state: &AppState,
    call: &CallRecord,
    payload: &WebhookPayload,
) -> Result<(Option<EmergencyType>, Value), ServerError> {
    let shared = state.trackers.open_with(&call.id, || restore_context(call));
    let context = shared.lock().context().clone();
    let mut tracker =
        StateTracker::from_context(context, state.trackers.limits()).with_call_id(call.id.as_str());

    let mut emergency = None;
    if !payload.utterances().is_empty() {
        for utterance in payload.utterances() {
            let outcome = tracker.on_utterance(utterance.role, &utterance.content);
            if let TurnOutcome::EmergencyDetected { emergency_type } = outcome {
                emergency.get_or_insert(emergency_type);
            }
        }
    } else if let Some(transcript) = payload.transcript_text() {
        tracker.add_utterance(UtteranceRole::User, transcript);
        if tracker.handle_emergency(transcript) {
            emergency = tracker.context().emergency_type;
        }
    }

    // a context restored from storage may already carry the flag
    if emergency.is_none() && tracker.context().is_emergency {
        emergency = tracker.context().emergency_type;
    }

    Ok((emergency, tracker.to_snapshot()?))
}

fn restore_context(call: &CallRecord) -> ConversationContext {
    let Some(snapshot) = call.context.clone() else {
        return ConversationContext::new();
    };
    match serde_json::from_value::<ConversationContext>(snapshot) {
        Ok(context) => context,
        Err(e) => {
            tracing::warn!(call_id = %call.id, error = %e, "Stored conversation context is invalid, starting fresh");
            ConversationContext::new()
        }
    }
}

async fn handle_call_analyzed(state: &AppState, payload: &WebhookPayload) -> Result<EventOutcome, ServerError> {
    let Some(call) = find_call(state, &payload.call_id).await? else {
        return Ok(EventOutcome::NoRecord {
            call_id: payload.call_id.clone(),
        });
    };

    let scenario = match resolve_scenario(state.store.as_ref(), &call).await {
        Ok(scenario) => scenario,
        Err(ExtractionError::Persistence(e)) => return Err(e.into()),
        Err(e) => {
            tracing::error!(call_id = %call.id, error = %e, "Cannot process transcript");
            return Ok(EventOutcome::Failed {
                call_id: payload.call_id.clone(),
                message: "Missing or invalid scenario_type for post-processing".to_string(),
            });
        }
    };

    if let Some(analysis) = &payload.call_analysis {
        tracing::info!(call_id = %call.id, analysis = %analysis, "Provider call analysis received");
    }

    let transcript = payload
        .transcript_text()
        .map(str::to_string)
        .or_else(|| {
            (!payload.utterances().is_empty())
                .then(|| dispatch_agent_core::transcript::render_transcript(payload.utterances()))
        });

    let post_processing_queued = match transcript {
        Some(transcript) => {
            let pipeline = state.pipeline.clone();
            let limits = state.settings.tracker;
            let call_id = call.id.clone();
            tokio::spawn(async move {
                let result = pipeline.process(&call_id, &transcript, scenario).await;
                tracing::debug!(
                    call_id = %call_id,
                    method = %result.method,
                    partial = result.partial,
                    persisted = result.persisted,
                    "Post-processing finished"
                );
                if let Err(e) = merge_into_context(pipeline.store().as_ref(), &call_id, &result.fields, limits).await {
                    tracing::warn!(call_id = %call_id, error = %e, "Failed to merge summary into call context");
                }
            });
            tracing::info!(call_id = %call.id, scenario = %scenario, "Queued transcript processing");
            true
        }
        None => {
            tracing::warn!(call_id = %call.id, "No transcript available, skipping post-processing");
            false
        }
    };

    Ok(EventOutcome::Analyzed {
        call_id: payload.call_id.clone(),
        internal_call_id: call.id,
        scenario,
        analysis_received: payload.call_analysis.is_some(),
        post_processing_queued,
    })
}

/// Fold extracted fields into the call's stored conversation context
async fn merge_into_context(
    store: &dyn CallStore,
    call_id: &str,
    fields: &FieldMap,
    limits: TrackerConfig,
) -> Result<(), ServerError> {
    let Some(call) = store.get_call(call_id).await? else {
        return Ok(());
    };

    let mut tracker = match call.context {
        Some(snapshot) => StateTracker::from_snapshot(snapshot, limits)?,
        None => StateTracker::new(limits),
    };
    tracker.apply_fields(fields);

    let update = CallUpdate {
        context: Some(tracker.to_snapshot()?),
        ..CallUpdate::default()
    };
    store.update_call(call_id, &update).await?;
    Ok(())
}
