//! Agent invocation: one model call in, one typed outcome out.
//!
//! The invoker is the failure boundary of the orchestrator. Whatever the
//! model collaborator does (returns an error, returns garbage, panics), the
//! caller receives an [`AgentOutcome`].

use crate::agent::schema::OutputSchema;
use crate::errors::InvokeError;
use crate::prompt::Prompt;
use async_trait::async_trait;
use audit_common::{AgentOutcome, ErrorKind};
use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

/// Phrases that mark a plain-text answer as the model declining.
const REFUSAL_MARKERS: &[&str] = &[
    "i can't",
    "i cannot",
    "i can not",
    "i'm unable",
    "i am unable",
    "i won't",
    "i will not",
    "i'm not able",
    "i am not able",
    "as an ai",
];

/// The external model transport.
///
/// Implementations request schema-constrained output and return the raw
/// response text. Retries and rate limiting, if any, belong here.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn invoke(&self, prompt: &str, schema_hint: &str) -> Result<String, InvokeError>;
}

/// Wraps a model client and normalizes every failure into an outcome.
#[derive(Clone)]
pub struct AgentInvoker {
    client: Arc<dyn ModelClient>,
}

impl AgentInvoker {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self { client }
    }

    /// Make exactly one model call and classify the result.
    pub async fn invoke(&self, prompt: &Prompt) -> AgentOutcome {
        let hint = prompt.schema.hint();
        let call = self.client.invoke(&prompt.text, &hint);
        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(Ok(raw)) => parse_output(&raw, &prompt.schema),
            Ok(Err(err)) => {
                let kind = classify_invoke_error(&err);
                warn!(kind = %kind, error = %err, "Model call failed");
                AgentOutcome::failure(kind, err.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(panic = %message, "Model client panicked");
                AgentOutcome::failure(
                    ErrorKind::TransportError,
                    format!("model client panicked: {}", message),
                )
            }
        }
    }
}

/// Map a transport error onto the outcome taxonomy.
pub fn classify_invoke_error(err: &InvokeError) -> ErrorKind {
    match err {
        InvokeError::Refused(_) => ErrorKind::UpstreamRefusal,
        InvokeError::Unauthenticated(_)
        | InvokeError::QuotaExceeded(_)
        | InvokeError::Network(_)
        | InvokeError::Other(_) => ErrorKind::TransportError,
    }
}

/// Parse raw model text into an outcome, enforcing the schema.
pub fn parse_output(raw: &str, schema: &OutputSchema) -> AgentOutcome {
    let text = strip_code_fence(raw);
    if text.is_empty() {
        return AgentOutcome::failure(ErrorKind::MalformedOutput, "empty response");
    }

    let value = match parse_json_object(text) {
        Some(value) => value,
        None if looks_like_refusal(text) => {
            return AgentOutcome::failure(ErrorKind::UpstreamRefusal, excerpt(text));
        }
        None => {
            return AgentOutcome::failure(
                ErrorKind::MalformedOutput,
                format!("response is not JSON: {}", excerpt(text)),
            );
        }
    };

    if let Some(refusal) = value.get("refusal").and_then(Value::as_str)
        && !refusal.trim().is_empty()
    {
        return AgentOutcome::failure(ErrorKind::UpstreamRefusal, refusal.trim().to_string());
    }

    match schema.validate(&value) {
        Ok(()) => {
            debug!("Model output matched schema");
            AgentOutcome::success(value)
        }
        Err(problems) => AgentOutcome::failure(
            ErrorKind::MalformedOutput,
            format!("schema violation: {}", problems),
        ),
    }
}

/// Remove a surrounding Markdown code fence (```json ... ```), if present.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    let body = body.trim_end().strip_suffix("```").unwrap_or(body).trim();
    // A fence opened and closed on one line leaves nothing after the newline.
    if body.is_empty() { trimmed } else { body }
}

/// Parse the text as JSON; fall back to the outermost `{...}` span when the
/// model wrapped the object in prose.
fn parse_json_object(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Some(value);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&text[start..=end])
        .ok()
        .filter(Value::is_object)
}

fn looks_like_refusal(text: &str) -> bool {
    let lower = text.to_lowercase().replace('\u{2019}', "'");
    REFUSAL_MARKERS.iter().any(|m| lower.starts_with(m))
        || (lower.len() < 400 && REFUSAL_MARKERS.iter().any(|m| lower.contains(m)))
}

fn excerpt(text: &str) -> String {
    const MAX: usize = 200;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::schema::FieldKind;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn schema() -> OutputSchema {
        OutputSchema::new().field("score", FieldKind::Score)
    }

    fn prompt() -> Prompt {
        Prompt {
            text: "rate it".to_string(),
            schema: schema(),
        }
    }

    struct Fixed(Result<String, InvokeError>, AtomicUsize);

    #[async_trait]
    impl ModelClient for Fixed {
        async fn invoke(&self, _: &str, _: &str) -> Result<String, InvokeError> {
            self.1.fetch_add(1, Ordering::SeqCst);
            self.0.clone()
        }
    }

    struct Panicking;

    #[async_trait]
    impl ModelClient for Panicking {
        async fn invoke(&self, _: &str, _: &str) -> Result<String, InvokeError> {
            panic!("boom");
        }
    }

    #[test]
    fn test_parse_plain_json() {
        let outcome = parse_output(r#"{"score": 80}"#, &schema());
        assert_eq!(outcome.payload(), Some(&json!({"score": 80})));
    }

    #[test]
    fn test_parse_fenced_json() {
        let outcome = parse_output("```json\n{\"score\": 12}\n```", &schema());
        assert_eq!(outcome.payload(), Some(&json!({"score": 12})));
    }

    #[test]
    fn test_parse_single_line_fence() {
        let outcome = parse_output("```{\"score\": 70}```", &schema());
        assert_eq!(outcome.payload(), Some(&json!({"score": 70})));

        let outcome = parse_output("```json {\"score\": 70} ```", &schema());
        assert_eq!(outcome.payload(), Some(&json!({"score": 70})));
    }

    #[test]
    fn test_parse_empty_fence_is_malformed() {
        let outcome = parse_output("```\n```", &schema());
        assert_eq!(
            outcome.failure_details().unwrap().kind,
            ErrorKind::MalformedOutput
        );
    }

    #[test]
    fn test_parse_json_wrapped_in_prose() {
        let outcome = parse_output("Here you go: {\"score\": 5} hope it helps", &schema());
        assert!(outcome.is_success());
    }

    #[test]
    fn test_parse_schema_violation_is_malformed() {
        let outcome = parse_output(r#"{"score": 140}"#, &schema());
        let failure = outcome.failure_details().unwrap();
        assert_eq!(failure.kind, ErrorKind::MalformedOutput);
        assert!(failure.message.contains("schema violation"));
    }

    #[test]
    fn test_parse_garbage_is_malformed() {
        let outcome = parse_output("score: eighty", &schema());
        assert_eq!(
            outcome.failure_details().unwrap().kind,
            ErrorKind::MalformedOutput
        );
    }

    #[test]
    fn test_parse_empty_is_malformed() {
        let outcome = parse_output("   ", &schema());
        assert_eq!(outcome.failure_details().unwrap().message, "empty response");
    }

    #[test]
    fn test_plain_text_refusal() {
        let outcome = parse_output("I can't help with evaluating this website.", &schema());
        assert_eq!(
            outcome.failure_details().unwrap().kind,
            ErrorKind::UpstreamRefusal
        );
    }

    #[test]
    fn test_json_refusal_field() {
        let outcome = parse_output(r#"{"refusal": "policy"}"#, &schema());
        let failure = outcome.failure_details().unwrap();
        assert_eq!(failure.kind, ErrorKind::UpstreamRefusal);
        assert_eq!(failure.message, "policy");
    }

    #[test]
    fn test_classify_invoke_errors() {
        assert_eq!(
            classify_invoke_error(&InvokeError::Unauthenticated("x".into())),
            ErrorKind::TransportError
        );
        assert_eq!(
            classify_invoke_error(&InvokeError::QuotaExceeded("x".into())),
            ErrorKind::TransportError
        );
        assert_eq!(
            classify_invoke_error(&InvokeError::Refused("x".into())),
            ErrorKind::UpstreamRefusal
        );
    }

    #[tokio::test]
    async fn test_invoke_makes_exactly_one_call() {
        let client = Arc::new(Fixed(Err(InvokeError::Network("reset".into())), AtomicUsize::new(0)));
        let invoker = AgentInvoker::new(client.clone());

        let outcome = invoker.invoke(&prompt()).await;

        assert_eq!(client.1.load(Ordering::SeqCst), 1);
        assert_eq!(
            outcome.failure_details().unwrap().kind,
            ErrorKind::TransportError
        );
    }

    struct Recording(std::sync::Mutex<Vec<(String, String)>>);

    #[async_trait]
    impl ModelClient for Recording {
        async fn invoke(&self, prompt: &str, schema_hint: &str) -> Result<String, InvokeError> {
            self.0
                .lock()
                .unwrap()
                .push((prompt.to_string(), schema_hint.to_string()));
            Ok(r#"{"score": 64}"#.to_string())
        }
    }

    #[tokio::test]
    async fn test_invoke_passes_prompt_and_schema_hint() {
        let client = Arc::new(Recording(std::sync::Mutex::new(Vec::new())));
        let invoker = AgentInvoker::new(client.clone());

        let outcome = invoker.invoke(&prompt()).await;

        assert_eq!(outcome.payload(), Some(&json!({"score": 64})));
        let calls = client.0.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "rate it");
        assert_eq!(calls[0].1, schema().hint());
    }

    #[tokio::test]
    async fn test_invoke_converts_panic_to_failure() {
        let invoker = AgentInvoker::new(Arc::new(Panicking));
        let outcome = invoker.invoke(&prompt()).await;
        let failure = outcome.failure_details().unwrap();
        assert_eq!(failure.kind, ErrorKind::TransportError);
        assert!(failure.message.contains("boom"));
    }
}
