//! Dispatch Agent Server
//!
//! Receives call-lifecycle webhooks from the voice provider, tracks each
//! call's conversation state and queues post-call extraction.

pub mod http;
pub mod metrics;
pub mod payload;
pub mod signature;
pub mod state;
pub mod webhook;

pub use crate::http::create_router;
pub use crate::metrics::init_metrics;
pub use payload::{normalize_payload, EventKind, WebhookPayload, WebhookResponse};
pub use state::AppState;
pub use webhook::EventOutcome;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] dispatch_agent_persistence::PersistenceError),

    #[error("Conversation state error: {0}")]
    Agent(#[from] dispatch_agent_agent::AgentError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<&ServerError> for StatusCode {
    fn from(err: &ServerError) -> Self {
        match err {
            ServerError::Auth(_) => StatusCode::UNAUTHORIZED,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Persistence(_) | ServerError::Agent(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, "Webhook processing failed");
        } else {
            tracing::warn!(error = %self, "Webhook rejected");
        }

        let body = Json(WebhookResponse {
            success: false,
            message: self.to_string(),
            data: None,
        });
        (status, body).into_response()
    }
}
