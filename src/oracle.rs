//! Answering oracle abstraction and implementations.
//!
//! Defines the [`Oracle`] trait and concrete implementations:
//! - **[`DisabledOracle`]** — fails every call; used when no provider is configured.
//! - **[`GeminiOracle`]** — calls the Gemini `generateContent` and `countTokens`
//!   REST endpoints.
//!
//! The oracle receives the repository context as the leading part of every
//! request, so a serving backend with prefix caching can reuse work across
//! turns. There is no retry or backoff: a failed call is reported to the
//! caller, which decides whether to ask again.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::OracleConfig;
use crate::error::OracleError;

/// Everything the oracle needs to answer one turn.
///
/// `prefix` is the verbatim context document and `question` is the separator
/// plus the user's query. They are sent in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleRequest {
    pub system_instruction: String,
    pub prefix: String,
    pub question: String,
}

/// A backend that answers questions and counts tokens.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-3-flash-preview"`).
    fn model_name(&self) -> &str;

    async fn answer(&self, request: &OracleRequest) -> Result<String, OracleError>;

    /// Exact token count of `text` for this model.
    async fn count_tokens(&self, text: &str) -> Result<usize, OracleError>;
}

/// Instantiate the oracle selected by `config.provider`.
pub fn create_oracle(config: &OracleConfig) -> Result<Box<dyn Oracle>, OracleError> {
    match config.provider.as_str() {
        "gemini" => Ok(Box::new(GeminiOracle::new(config)?)),
        "disabled" => Ok(Box::new(DisabledOracle)),
        other => Err(OracleError::UnknownProvider(other.to_string())),
    }
}

// ============ Disabled Oracle ============

pub struct DisabledOracle;

#[async_trait]
impl Oracle for DisabledOracle {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn answer(&self, _request: &OracleRequest) -> Result<String, OracleError> {
        Err(OracleError::Disabled)
    }

    async fn count_tokens(&self, _text: &str) -> Result<usize, OracleError> {
        Err(OracleError::Disabled)
    }
}

// ============ Gemini Oracle ============

/// Oracle backed by the Gemini REST API.
///
/// Requires the API key in the environment variable named by
/// `oracle.api_key_env` (default `GEMINI_API_KEY`).
pub struct GeminiOracle {
    client: reqwest::Client,
    model: String,
    base_url: String,
    api_key: String,
    include_thoughts: bool,
}

impl GeminiOracle {
    /// # Errors
    ///
    /// Returns [`OracleError::Auth`] if the API key variable is not set.
    pub fn new(config: &OracleConfig) -> Result<Self, OracleError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            OracleError::Auth(format!("{} environment variable not set", config.api_key_env))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            include_thoughts: config.include_thoughts,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, self.model, method)
    }

    async fn post(&self, method: &str, body: &Value) -> Result<Value, OracleError> {
        let response = self
            .client
            .post(self.endpoint(method))
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| OracleError::InvalidResponse(e.to_string()));
        }

        let body_text = response.text().await.unwrap_or_default();
        Err(classify_status(status.as_u16(), body_text))
    }
}

#[async_trait]
impl Oracle for GeminiOracle {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn answer(&self, request: &OracleRequest) -> Result<String, OracleError> {
        let body = generate_body(request, self.include_thoughts);
        debug!(
            model = %self.model,
            prefix_bytes = request.prefix.len(),
            "sending generateContent"
        );
        let json = self.post("generateContent", &body).await?;
        parse_generate_response(&json)
    }

    async fn count_tokens(&self, text: &str) -> Result<usize, OracleError> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": text }] }],
        });
        let json = self.post("countTokens", &body).await?;
        json.get("totalTokens")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .ok_or_else(|| OracleError::InvalidResponse("missing totalTokens".into()))
    }
}

fn generate_body(request: &OracleRequest, include_thoughts: bool) -> Value {
    json!({
        "system_instruction": {
            "parts": [{ "text": request.system_instruction }],
        },
        "contents": [{
            "role": "user",
            "parts": [
                { "text": request.prefix },
                { "text": request.question },
            ],
        }],
        "generationConfig": {
            "thinkingConfig": { "includeThoughts": include_thoughts },
        },
    })
}

/// Concatenate the non-thought text parts of the first candidate.
fn parse_generate_response(json: &Value) -> Result<String, OracleError> {
    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| OracleError::InvalidResponse("missing candidates[0].content.parts".into()))?;

    let text: String = parts
        .iter()
        .filter(|p| !p.get("thought").and_then(Value::as_bool).unwrap_or(false))
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();

    if text.is_empty() {
        return Err(OracleError::InvalidResponse(
            "response contained no answer text".into(),
        ));
    }
    Ok(text)
}

fn classify_status(status: u16, body: String) -> OracleError {
    match status {
        401 | 403 => OracleError::Auth(body),
        429 => OracleError::Quota(body),
        _ => OracleError::Api { status, body },
    }
}
