//! Shared data model for the site-audit orchestrator.
//!
//! These types cross the boundary between the orchestrator and whatever
//! presents its results, so their serialized form is a stable wire contract:
//!
//! - [`ClientBrief`]: who the audit is for (caller supplied, immutable)
//! - [`ScrapedContent`]: what the fetch collaborator found on the site
//! - [`AgentOutcome`]: the tagged success/failure result of one agent
//! - [`AuditReport`]: the synthesized, per-agent keyed report

pub mod brief;
pub mod content;
pub mod outcome;
pub mod report;

pub use brief::{BriefError, ClientBrief};
pub use content::{DEFAULT_PREVIEW_CHARS, ScrapedContent, UNAVAILABLE_TITLE};
pub use outcome::{AgentFailure, AgentOutcome, ErrorKind};
pub use report::{AuditReport, ReportMetadata, ReportScores, ScoreValue};
