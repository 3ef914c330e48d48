//! Client brief supplied by the caller of an audit.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while constructing a [`ClientBrief`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BriefError {
    #[error("Client name must not be empty")]
    EmptyName,
}

/// Who the audit is for and what they want from their web presence.
///
/// Immutable once constructed. Only `name` is required; the other fields may
/// be empty and are rendered as an explicit placeholder in prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawClientBrief")]
pub struct ClientBrief {
    name: String,
    industry: String,
    stated_goals: String,
}

impl ClientBrief {
    /// Create a brief, rejecting a blank client name.
    ///
    /// ```
    /// use audit_common::ClientBrief;
    ///
    /// let brief = ClientBrief::new("Acme School", "education", "").unwrap();
    /// assert_eq!(brief.name(), "Acme School");
    /// assert!(ClientBrief::new("   ", "", "").is_err());
    /// ```
    pub fn new(
        name: impl Into<String>,
        industry: impl Into<String>,
        stated_goals: impl Into<String>,
    ) -> Result<Self, BriefError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(BriefError::EmptyName);
        }
        Ok(Self {
            name,
            industry: industry.into().trim().to_string(),
            stated_goals: stated_goals.into().trim().to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn industry(&self) -> &str {
        &self.industry
    }

    pub fn stated_goals(&self) -> &str {
        &self.stated_goals
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClientBrief {
    name: String,
    #[serde(default)]
    industry: String,
    #[serde(default)]
    stated_goals: String,
}

impl TryFrom<RawClientBrief> for ClientBrief {
    type Error = BriefError;

    fn try_from(raw: RawClientBrief) -> Result<Self, Self::Error> {
        ClientBrief::new(raw.name, raw.industry, raw.stated_goals)
    }
}
