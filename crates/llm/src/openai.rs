//! OpenAI-compatible structured-extraction client
//!
//! Sends one chat/completions request per transcript with JSON-object
//! output and hands back the parsed object unvalidated. Contract validation
//! happens in the pipeline.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use dispatch_agent_config::ExtractionConfig;
use dispatch_agent_core::{ExtractionContract, ExtractorError, ProviderOutput, StructuredExtractor};

use crate::prompt::{ExtractionPromptBuilder, Message};
use crate::LlmError;

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Structured-extraction provider backed by a chat completions API
pub struct OpenAiExtractor {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl std::fmt::Debug for OpenAiExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiExtractor")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl OpenAiExtractor {
    /// Build a client from settings. Fails without an API key.
    pub fn new(config: &ExtractionConfig) -> Result<Self, LlmError> {
        let api_key = config.resolved_api_key().ok_or(LlmError::MissingApiKey)?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    /// Parse a chat completions response body into provider output.
    pub fn parse_completion(body: &str) -> Result<ProviderOutput, LlmError> {
        let response: ChatResponse =
            serde_json::from_str(body).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let choice = response.choices.first().ok_or(LlmError::EmptyResponse)?;
        let content = choice
            .message
            .content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        let fields = match serde_json::from_str::<Value>(content) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(LlmError::InvalidJson(format!(
                    "expected a JSON object, got {}",
                    json_type_name(&other)
                )))
            }
            Err(e) => return Err(LlmError::InvalidJson(e.to_string())),
        };

        let raw = serde_json::json!({
            "id": response.id,
            "model": response.model,
            "finish_reason": choice.finish_reason,
            "usage": response.usage,
        });

        Ok(ProviderOutput { fields, raw })
    }

    async fn complete(&self, messages: Vec<Message>) -> Result<ProviderOutput, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            response_format: ResponseFormat { kind: "json_object" },
            temperature: self.temperature,
        };

        tracing::debug!(model = %self.model, "Sending extraction request");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: truncate(&body, 500),
            });
        }

        Self::parse_completion(&body)
    }
}

#[async_trait]
impl StructuredExtractor for OpenAiExtractor {
    async fn extract(
        &self,
        transcript: &str,
        contract: &ExtractionContract,
    ) -> Result<ProviderOutput, ExtractorError> {
        let messages = ExtractionPromptBuilder::new(contract).build(transcript);

        self.complete(messages).await.map_err(|e| {
            tracing::warn!(
                model = %self.model,
                scenario = %contract.scenario,
                error = %e,
                "Structured extraction request failed"
            );
            ExtractorError::from(e)
        })
    }

    fn name(&self) -> &str {
        "openai"
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
