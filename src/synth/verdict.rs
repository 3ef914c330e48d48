//! The verdict decision rule.
//!
//! Every integer score in 0..=100 maps to exactly one tier:
//!
//! - **Cautionary**: `score < caution_below`
//! - **Mixed**: `caution_below <= score <= trust_above`
//! - **Trustworthy**: `score > trust_above`
//!
//! With the defaults (50, 80) a score of exactly 50 is Mixed and exactly 80
//! is Mixed; 49 is Cautionary and 81 is Trustworthy.

use crate::agent::FACT_CHECKLIST;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const DEFAULT_CAUTION_BELOW: u8 = 50;
pub const DEFAULT_TRUST_ABOVE: u8 = 80;

/// Answers that mean "no answer" on either side of a fact comparison.
const NON_ANSWERS: &[&str] = &["", "unknown", "not found", "n/a", "none", "null", "unspecified"];

/// Boundaries of the verdict tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerdictThresholds {
    /// Scores strictly below this are cautionary.
    pub caution_below: u8,
    /// Scores strictly above this are trustworthy.
    pub trust_above: u8,
}

impl Default for VerdictThresholds {
    fn default() -> Self {
        Self {
            caution_below: DEFAULT_CAUTION_BELOW,
            trust_above: DEFAULT_TRUST_ABOVE,
        }
    }
}

impl VerdictThresholds {
    /// Check that every tier is reachable within 0..=100.
    pub fn validate(&self) -> Result<(), String> {
        if self.caution_below == 0 {
            return Err("verdict.caution_below must be at least 1".to_string());
        }
        if self.trust_above >= 100 {
            return Err("verdict.trust_above must be below 100".to_string());
        }
        if self.caution_below > self.trust_above {
            return Err(format!(
                "verdict.caution_below ({}) must not exceed verdict.trust_above ({})",
                self.caution_below, self.trust_above
            ));
        }
        Ok(())
    }

    /// Classify a score.
    pub fn tier(&self, score: u8) -> VerdictTier {
        if score < self.caution_below {
            VerdictTier::Cautionary
        } else if score <= self.trust_above {
            VerdictTier::Mixed
        } else {
            VerdictTier::Trustworthy
        }
    }
}

/// Verdict tier of a combined score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictTier {
    Cautionary,
    Mixed,
    Trustworthy,
}

impl VerdictTier {
    pub fn headline(&self) -> &'static str {
        match self {
            Self::Cautionary => {
                "the web presence is not a reliable source of facts and needs attention"
            }
            Self::Mixed => "the web presence is partly reliable; review the flagged issues",
            Self::Trustworthy => "the web presence is consistent and serves the client's goals",
        }
    }
}

impl fmt::Display for VerdictTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cautionary => write!(f, "Cautionary"),
            Self::Mixed => write!(f, "Mixed"),
            Self::Trustworthy => write!(f, "Trustworthy"),
        }
    }
}

/// A fact on which the memory guess and the site disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discrepancy {
    pub fact: String,
    pub believed: String,
    pub found: String,
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: believed \"{}\" but the site says \"{}\"",
            self.fact, self.believed, self.found
        )
    }
}

/// Compare a memory-based `facts` object with a content-grounded one.
///
/// Checklist keys come first, in checklist order, followed by any other keys
/// the memory answer used, sorted. A fact the memory claims but the site does
/// not state counts as a discrepancy; a fact the memory did not know does not.
pub fn find_discrepancies(believed: &Value, found: &Value) -> Vec<Discrepancy> {
    let Some(believed) = believed.as_object() else {
        return Vec::new();
    };
    let found = found.as_object();

    let mut keys: Vec<&str> = FACT_CHECKLIST.iter().map(|(key, _)| *key).collect();
    let mut extra: Vec<&str> = believed
        .keys()
        .map(String::as_str)
        .filter(|k| !keys.contains(k))
        .collect();
    extra.sort_unstable();
    keys.extend(extra);

    keys.into_iter()
        .filter_map(|key| {
            let claim = render(believed.get(key)?);
            if is_non_answer(&claim) {
                return None;
            }
            let actual = found.and_then(|f| f.get(key)).map(render).unwrap_or_default();
            if is_non_answer(&actual) {
                return Some(Discrepancy {
                    fact: key.to_string(),
                    believed: claim,
                    found: "not stated".to_string(),
                });
            }
            if agrees(&claim, &actual) {
                None
            } else {
                Some(Discrepancy {
                    fact: key.to_string(),
                    believed: claim,
                    found: actual,
                })
            }
        })
        .collect()
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn normalize(s: &str) -> String {
    s.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_non_answer(s: &str) -> bool {
    NON_ANSWERS.contains(&normalize(s).trim_end_matches('.'))
}

/// Equal after normalization, or one answer contains the other
/// ("John Roe" vs "Mr John Roe").
fn agrees(a: &str, b: &str) -> bool {
    let (a, b) = (normalize(a), normalize(b));
    a == b || a.contains(&b) || b.contains(&a)
}
