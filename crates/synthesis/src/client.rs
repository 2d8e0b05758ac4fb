//! HTTP client for the prompt synthesis workflow service.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::intent::StructuredIntent;
use crate::payload::SynthesisPayload;

/// Default endpoint of a locally running workflow service.
pub const DEFAULT_SYNTHESIS_URL: &str = "http://127.0.0.1:5001/v1/workflows/run";
/// Default `user` field sent with every request.
pub const DEFAULT_SYNTHESIS_USER: &str = "storyforge";
/// Synthesis runs an LLM workflow end to end; allow it a full minute.
pub const DEFAULT_SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for [`SynthesisClient`].
#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub user: String,
    pub timeout: Duration,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SYNTHESIS_URL.to_string(),
            api_key: None,
            user: DEFAULT_SYNTHESIS_USER.to_string(),
            timeout: DEFAULT_SYNTHESIS_TIMEOUT,
        }
    }
}

/// Reasons a synthesis call produced nothing. Logged, never returned by
/// [`PromptSynthesizer::synthesize`].
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Synthesis service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response has no data.outputs.{0}")]
    MissingOutput(&'static str),

    #[error("Output value of type {0} carries no prompts")]
    UnsupportedShape(&'static str),
}

/// Source of generation prompts.
#[async_trait]
pub trait PromptSynthesizer: Send + Sync {
    /// Produce prompts for `intent`. An empty list means synthesis failed
    /// or returned nothing usable.
    async fn synthesize(&self, intent: &StructuredIntent) -> Vec<String>;
}

/// [`PromptSynthesizer`] backed by a blocking-mode workflow run.
#[derive(Clone)]
pub struct SynthesisClient {
    client: reqwest::Client,
    config: SynthesisConfig,
}

impl SynthesisClient {
    pub fn new(config: SynthesisConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: SynthesisConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Build the request body for `intent`.
    pub fn request_body(&self, intent: &StructuredIntent) -> Value {
        json!({
            "inputs": {
                "text": intent.text,
                "roles": intent.descriptor_text(),
                "cmd": intent.command.as_str(),
            },
            "response_mode": "blocking",
            "user": self.config.user,
        })
    }

    /// One round trip, surfacing every failure as a [`SynthesisError`].
    pub async fn try_synthesize(
        &self,
        intent: &StructuredIntent,
    ) -> Result<Vec<String>, SynthesisError> {
        let mut request = self
            .client
            .post(&self.config.url)
            .timeout(self.config.timeout)
            .json(&self.request_body(intent));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(SynthesisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        let output = extract_output(body, intent)?;
        let shape = value_kind(&output);
        let payload =
            SynthesisPayload::from_value(output).ok_or(SynthesisError::UnsupportedShape(shape))?;
        Ok(payload.into_prompts())
    }
}

#[async_trait]
impl PromptSynthesizer for SynthesisClient {
    async fn synthesize(&self, intent: &StructuredIntent) -> Vec<String> {
        match self.try_synthesize(intent).await {
            Ok(prompts) => {
                tracing::debug!(
                    command = intent.command.as_str(),
                    count = prompts.len(),
                    "Synthesized prompts",
                );
                prompts
            }
            Err(e) => {
                tracing::warn!(
                    command = intent.command.as_str(),
                    error = %e,
                    "Prompt synthesis failed",
                );
                Vec::new()
            }
        }
    }
}

/// Take `data.outputs.<key>`, falling back to the command's other key.
fn extract_output(mut body: Value, intent: &StructuredIntent) -> Result<Value, SynthesisError> {
    let key = intent.command.output_key();
    let Some(outputs) = body
        .get_mut("data")
        .and_then(|d| d.get_mut("outputs"))
        .and_then(Value::as_object_mut)
    else {
        return Err(SynthesisError::MissingOutput(key));
    };

    outputs
        .remove(key)
        .filter(|v| !v.is_null())
        .or_else(|| outputs.remove(intent.command.fallback_key()))
        .filter(|v| !v.is_null())
        .ok_or(SynthesisError::MissingOutput(key))
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
