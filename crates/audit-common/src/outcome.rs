//! Per-agent outcomes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Why an agent produced no usable payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Network, authentication or quota failure below the model.
    TransportError,
    /// The response was not JSON or did not match the expected schema.
    MalformedOutput,
    /// The model declined to answer.
    UpstreamRefusal,
}

impl ErrorKind {
    /// Short label used in prompts and terminal output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::TransportError => "transport error",
            Self::MalformedOutput => "malformed output",
            Self::UpstreamRefusal => "model refused",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure details carried by [`AgentOutcome::Failure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentFailure {
    pub kind: ErrorKind,
    pub message: String,
}

/// The result of exactly one agent invocation.
///
/// Serialized as `{"status": "ok", "payload": ...}` or
/// `{"status": "failed", "error": {"kind": ..., "message": ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum AgentOutcome {
    #[serde(rename = "ok")]
    Success { payload: Value },
    #[serde(rename = "failed")]
    Failure { error: AgentFailure },
}

impl AgentOutcome {
    pub fn success(payload: Value) -> Self {
        Self::Success { payload }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failure {
            error: AgentFailure {
                kind,
                message: message.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The structured payload, if the agent succeeded.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Success { payload } => Some(payload),
            Self::Failure { .. } => None,
        }
    }

    /// The failure details, if the agent failed.
    pub fn failure_details(&self) -> Option<&AgentFailure> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error } => Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_wire_shape() {
        let outcome = AgentOutcome::success(json!({"score": 70}));
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value, json!({"status": "ok", "payload": {"score": 70}}));
    }

    #[test]
    fn test_failure_wire_shape() {
        let outcome = AgentOutcome::failure(ErrorKind::UpstreamRefusal, "declined");
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            value,
            json!({"status": "failed", "error": {"kind": "upstream_refusal", "message": "declined"}})
        );
        assert!(outcome.payload().is_none());
        assert_eq!(
            outcome.failure_details().map(|f| f.kind),
            Some(ErrorKind::UpstreamRefusal)
        );
    }
}
