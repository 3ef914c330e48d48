//! The audit report and its JSON wire contract.
//!
//! Top-level shape is fixed:
//!
//! ```text
//! {
//!   "perAgent": { "<agentId>": { "status": "ok" | "failed", "payload" | "error" } },
//!   "derivedVerdict": string | null,
//!   "metadata": { "client", "url", "siteContentAvailable", "scores" }
//! }
//! ```

use crate::outcome::AgentOutcome;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A derived score, or the explicit `"unavailable"` sentinel.
///
/// The sentinel is used instead of zero so a missing score can never be read
/// as a real (very bad) one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreValue {
    Score(u8),
    #[default]
    Unavailable,
}

impl ScoreValue {
    pub const UNAVAILABLE: &'static str = "unavailable";

    pub fn as_score(&self) -> Option<u8> {
        match self {
            Self::Score(s) => Some(*s),
            Self::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Score(_))
    }
}

impl From<Option<u8>> for ScoreValue {
    fn from(score: Option<u8>) -> Self {
        score.map_or(Self::Unavailable, Self::Score)
    }
}

impl fmt::Display for ScoreValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Score(s) => write!(f, "{}", s),
            Self::Unavailable => f.write_str(Self::UNAVAILABLE),
        }
    }
}

impl Serialize for ScoreValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Score(s) => serializer.serialize_u8(*s),
            Self::Unavailable => serializer.serialize_str(Self::UNAVAILABLE),
        }
    }
}

impl<'de> Deserialize<'de> for ScoreValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u8),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(s) => Ok(Self::Score(s)),
            Raw::Text(t) if t == Self::UNAVAILABLE => Ok(Self::Unavailable),
            Raw::Text(t) => Err(serde::de::Error::custom(format!(
                "expected a score or \"{}\", got \"{}\"",
                Self::UNAVAILABLE,
                t
            ))),
        }
    }
}

/// Cross-agent scores extracted by the synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportScores {
    pub integrity: ScoreValue,
    pub brand_alignment: ScoreValue,
}

/// Who and what was audited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub client: String,
    pub url: String,
    pub site_content_available: bool,
    #[serde(default)]
    pub scores: ReportScores,
}

/// The synthesized result of one audit run.
///
/// Built once and never mutated. `per_agent` holds exactly one entry for
/// every agent of the executed plan, failures included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    per_agent: BTreeMap<String, AgentOutcome>,
    derived_verdict: Option<String>,
    metadata: ReportMetadata,
}

impl AuditReport {
    pub fn new(
        per_agent: BTreeMap<String, AgentOutcome>,
        derived_verdict: Option<String>,
        metadata: ReportMetadata,
    ) -> Self {
        Self {
            per_agent,
            derived_verdict,
            metadata,
        }
    }

    pub fn per_agent(&self) -> &BTreeMap<String, AgentOutcome> {
        &self.per_agent
    }

    pub fn outcome(&self, agent_id: &str) -> Option<&AgentOutcome> {
        self.per_agent.get(agent_id)
    }

    pub fn derived_verdict(&self) -> Option<&str> {
        self.derived_verdict.as_deref()
    }

    pub fn metadata(&self) -> &ReportMetadata {
        &self.metadata
    }

    pub fn scores(&self) -> &ReportScores {
        &self.metadata.scores
    }

    /// Number of agents whose outcome is a failure.
    pub fn failed_count(&self) -> usize {
        self.per_agent.values().filter(|o| !o.is_success()).count()
    }
}
