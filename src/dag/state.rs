//! Run state tracking for the orchestrator.

use audit_common::AgentOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Outcomes keyed by agent id.
///
/// Ordered so reports and prompts render agents deterministically.
pub type OutcomeMap = BTreeMap<String, AgentOutcome>;

/// Summary of one orchestrator run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub plan: String,
    pub total_agents: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub waves: usize,
    pub started_at: Option<DateTime<Utc>>,
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl RunSummary {
    pub fn new(plan: &str, total_agents: usize) -> Self {
        Self {
            plan: plan.to_string(),
            total_agents,
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Count an outcome toward the summary.
    pub fn record(&mut self, outcome: &AgentOutcome) {
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn all_success(&self) -> bool {
        self.failed == 0 && self.succeeded == self.total_agents
    }

    pub fn completed(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Tracks execution timing.
pub struct ExecutionTimer {
    start: Instant,
}

impl ExecutionTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Durations serialize as whole milliseconds.
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
