//! HTTP model client for a Gemini-style `generateContent` endpoint.
//!
//! Requests JSON output (`responseMimeType = application/json`) and returns
//! the concatenated text of the first candidate. Retries are not attempted;
//! every call the orchestrator makes is exactly one HTTP request.

use crate::agent::ModelClient;
use crate::errors::InvokeError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

/// Finish reasons that mean the model withheld its answer.
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
];

/// Settings for [`HttpModelClient`].
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
    pub temperature: f32,
}

/// Calls a hosted generative model over HTTP.
#[derive(Debug, Clone)]
pub struct HttpModelClient {
    client: reqwest::Client,
    settings: ModelSettings,
}

impl HttpModelClient {
    pub fn new(settings: ModelSettings) -> Result<Self, InvokeError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| InvokeError::Other(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, settings })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.endpoint.trim_end_matches('/'),
            self.settings.model
        )
    }

    fn request_body(&self, prompt: &str, schema_hint: &str) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }],
            "systemInstruction": {
                "parts": [{ "text": format!("Respond with a single JSON object of this shape: {}", schema_hint) }]
            },
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": self.settings.temperature
            }
        })
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn invoke(&self, prompt: &str, schema_hint: &str) -> Result<String, InvokeError> {
        debug!(model = %self.settings.model, prompt_chars = prompt.len(), "Calling model");

        let resp = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&self.request_body(prompt, schema_hint))
            .send()
            .await
            .map_err(|e| InvokeError::Network(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| InvokeError::Network(e.to_string()))?;

        if !status.is_success() {
            warn!(model = %self.settings.model, %status, "Model endpoint returned error status");
            return Err(classify_status(status, &body));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| InvokeError::Other(format!("unreadable model response: {}", e)))?;
        extract_text(&value)
    }
}

/// Map a non-success HTTP status onto the transport error taxonomy.
pub fn classify_status(status: StatusCode, body: &str) -> InvokeError {
    let message = error_message(body).unwrap_or_else(|| format!("HTTP {}", status));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => InvokeError::Unauthenticated(message),
        StatusCode::TOO_MANY_REQUESTS => InvokeError::QuotaExceeded(message),
        _ => InvokeError::Other(message),
    }
}

fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Pull the answer text out of a `generateContent` response.
pub fn extract_text(response: &Value) -> Result<String, InvokeError> {
    if let Some(reason) = response
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
    {
        return Err(InvokeError::Refused(format!("prompt blocked: {}", reason)));
    }

    let Some(candidate) = response.pointer("/candidates/0") else {
        return Err(InvokeError::Other("response has no candidates".to_string()));
    };

    if let Some(reason) = candidate.get("finishReason").and_then(Value::as_str)
        && BLOCKING_FINISH_REASONS.contains(&reason)
    {
        return Err(InvokeError::Refused(format!("answer withheld: {}", reason)));
    }

    let text: String = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpModelClient {
        HttpModelClient::new(ModelSettings {
            endpoint: "https://models.example/v1beta/".to_string(),
            model: "test-model".to_string(),
            api_key: "k".to_string(),
            timeout: Duration::from_secs(5),
            temperature: 0.2,
        })
        .unwrap()
    }

    #[test]
    fn test_url_joins_endpoint_and_model() {
        assert_eq!(
            client().url(),
            "https://models.example/v1beta/models/test-model:generateContent"
        );
    }

    #[test]
    fn test_request_asks_for_json() {
        let body = client().request_body("hello", "{\"score\": <integer 0-100>}");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, ""),
            InvokeError::Unauthenticated(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, ""),
            InvokeError::Unauthenticated(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, ""),
            InvokeError::QuotaExceeded(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, ""),
            InvokeError::Other(_)
        ));
    }

    #[test]
    fn test_status_message_comes_from_error_body() {
        let err = classify_status(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error": {"code": 429, "message": "Resource has been exhausted"}}"#,
        );
        assert_eq!(err, InvokeError::QuotaExceeded("Resource has been exhausted".into()));
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response = json!({
            "candidates": [{
                "content": {"parts": [{"text": "{\"score\":"}, {"text": " 72}"}]},
                "finishReason": "STOP"
            }]
        });
        assert_eq!(extract_text(&response).unwrap(), "{\"score\": 72}");
    }

    #[test]
    fn test_blocked_prompt_is_refused() {
        let response = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        assert!(matches!(extract_text(&response), Err(InvokeError::Refused(_))));
    }

    #[test]
    fn test_safety_finish_is_refused() {
        let response = json!({"candidates": [{"finishReason": "SAFETY"}]});
        assert!(matches!(extract_text(&response), Err(InvokeError::Refused(_))));
    }

    #[test]
    fn test_no_candidates_is_other() {
        assert!(matches!(extract_text(&json!({})), Err(InvokeError::Other(_))));
    }
}
