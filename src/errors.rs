//! Typed error hierarchy for the audit orchestrator.
//!
//! - `PlanError`: invalid plan configuration, raised before any invocation
//! - `FetchError`: page fetch collaborator failures
//! - `InvokeError`: model transport collaborator failures
//! - `ConfigError`: configuration loading and validation
//! - `AuditCancelled`: the caller cancelled a run mid-flight
//!
//! Per-agent failures never surface as errors; the invoker turns them into
//! `AgentOutcome::Failure`. Only `PlanError` and `ConfigError` abort work.

use std::path::PathBuf;
use thiserror::Error;

/// Errors detected while constructing an audit plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("Plan '{plan}' has no agents")]
    EmptyPlan { plan: String },

    #[error("Duplicate agent id: {id}")]
    DuplicateId { id: String },

    #[error("Invalid agent id '{id}': ids are non-empty and use only letters, digits, '_', '.' or '-'")]
    InvalidId { id: String },

    #[error("Agent '{agent}' has a malformed reference '{{prior:{reference}'")]
    MalformedReference { agent: String, reference: String },

    #[error("Unknown dependency '{dependency}' in agent '{agent}': no agent with that id exists")]
    UnknownDependency { agent: String, dependency: String },

    #[error("Cycle detected in agent dependencies. Involved agents: {agents:?}")]
    Cycle { agents: Vec<String> },

    #[error("Agent '{agent}' quotes '{{prior:{reference}}}' but does not depend on '{reference}'")]
    UndeclaredReference { agent: String, reference: String },

    #[error("Agent '{agent}' template uses unknown placeholder '{{{placeholder}}}'")]
    UnknownPlaceholder { agent: String, placeholder: String },

    #[error("Unknown agent role '{role}'")]
    UnknownRole { role: String },

    #[error("Unknown plan '{name}'. Available plans: {available}")]
    UnknownPlan { name: String, available: String },
}

/// Errors from the page fetch collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Timed out after {secs}s fetching {url}")]
    Timeout { url: String, secs: u64 },

    #[error("Navigation to {url} failed: {message}")]
    NavigationFailed { url: String, message: String },

    #[error("Fetch failed: {0}")]
    Other(String),
}

/// Errors from the model transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    #[error("Model endpoint rejected credentials: {0}")]
    Unauthenticated(String),

    #[error("Model quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Network error calling model: {0}")]
    Network(String),

    #[error("Model declined the request: {0}")]
    Refused(String),

    #[error("Model call failed: {0}")]
    Other(String),
}

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write config file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// The caller cancelled an audit before every wave settled.
///
/// No partial report is produced; `completed` counts the agents whose outcome
/// had been recorded when the run stopped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Audit cancelled after {completed} of {total} agents completed")]
pub struct AuditCancelled {
    pub completed: usize,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_error_cycle_lists_agents() {
        let err = PlanError::Cycle {
            agents: vec!["a".to_string(), "b".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Cycle"));
        assert!(msg.contains("\"a\""));
    }

    #[test]
    fn plan_error_undeclared_reference_renders_placeholder() {
        let err = PlanError::UndeclaredReference {
            agent: "judge".to_string(),
            reference: "memory".to_string(),
        };
        assert!(err.to_string().contains("{prior:memory}"));
    }

    #[test]
    fn config_error_converts_from_plan_error() {
        let err: ConfigError = PlanError::DuplicateId { id: "x".into() }.into();
        assert!(matches!(err, ConfigError::Plan(PlanError::DuplicateId { .. })));
    }

    #[test]
    fn fetch_error_timeout_carries_seconds() {
        let err = FetchError::Timeout {
            url: "https://x".into(),
            secs: 30,
        };
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&PlanError::EmptyPlan { plan: "p".into() });
        assert_std_error(&FetchError::Other("x".into()));
        assert_std_error(&InvokeError::Network("x".into()));
        assert_std_error(&ConfigError::Invalid("x".into()));
        assert_std_error(&AuditCancelled {
            completed: 1,
            total: 2,
        });
    }
}
