//! Agent specifications: the static "questions" a plan can ask the model.

use crate::agent::schema::{FieldKind, OutputSchema};
use crate::errors::PlanError;
use crate::prompt::templates;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The checklist of facts the fact auditor extracts and the memory probe
/// guesses. Keys are the JSON keys expected inside `facts`.
pub const FACT_CHECKLIST: &[(&str, &str)] = &[
    ("director", "Name of the director, owner or head of the organisation"),
    ("contact_email", "Primary public contact e-mail address"),
    ("application_deadline", "Next application, enrolment or order deadline"),
    ("pricing", "Tuition, fees or headline pricing"),
    ("open_day", "Next open day or public event"),
    ("facilities", "Notable facilities or amenities (e.g. swimming pool)"),
];

/// Which cross-agent score a role feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivedScore {
    Integrity,
    BrandAlignment,
}

/// The role an agent plays when prompting the model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AgentRole {
    /// Extracts facts grounded in the scraped content and rates data integrity.
    FactAuditor,
    /// Judges tone and alignment of the site with the client's stated goals.
    BrandPsychologist,
    /// Answers the fact checklist from memory alone, without site content.
    NaiveMemory,
    /// Summarises the public reputation of the client.
    ReputationAnalyst,
    /// Compares earlier answers and rates how trustworthy the presence is.
    SynthesisJudge,
    /// User-defined role. Without a template of its own it gets the generic
    /// audit template, and its answer only needs a `summary` string.
    Custom(String),
}

impl AgentRole {
    pub fn display_name(&self) -> &str {
        match self {
            Self::FactAuditor => "Fact Auditor",
            Self::BrandPsychologist => "Brand Psychologist",
            Self::NaiveMemory => "Naive Memory Probe",
            Self::ReputationAnalyst => "Reputation Analyst",
            Self::SynthesisJudge => "Synthesis Judge",
            Self::Custom(name) => name,
        }
    }

    /// Whether the role's prompt may include scraped site content.
    ///
    /// The memory probe is deliberately blind to the site.
    pub fn sees_site_content(&self) -> bool {
        !matches!(self, Self::NaiveMemory)
    }

    /// The derived score this role contributes, and the payload field holding it.
    pub fn derived_score(&self) -> Option<(DerivedScore, &'static str)> {
        match self {
            Self::FactAuditor | Self::SynthesisJudge => {
                Some((DerivedScore::Integrity, "integrity_score"))
            }
            Self::BrandPsychologist => Some((DerivedScore::BrandAlignment, "alignment_score")),
            _ => None,
        }
    }

    /// Default output schema for built-in roles.
    pub fn default_schema(&self) -> OutputSchema {
        match self {
            Self::FactAuditor => OutputSchema::new()
                .field("facts", FieldKind::Object)
                .field("integrity_score", FieldKind::Score)
                .field("issues", FieldKind::Array)
                .field("summary", FieldKind::String),
            Self::BrandPsychologist => OutputSchema::new()
                .field("alignment_score", FieldKind::Score)
                .field("perceived_tone", FieldKind::String)
                .field("strengths", FieldKind::Array)
                .field("weaknesses", FieldKind::Array)
                .field("summary", FieldKind::String),
            Self::NaiveMemory => OutputSchema::new()
                .field("facts", FieldKind::Object)
                .field("confidence", FieldKind::Score)
                .field("summary", FieldKind::String),
            Self::ReputationAnalyst => OutputSchema::new()
                .field("reputation_score", FieldKind::Score)
                .field("risks", FieldKind::Array)
                .field("summary", FieldKind::String),
            Self::SynthesisJudge => OutputSchema::new()
                .field("integrity_score", FieldKind::Score)
                .field("discrepancies", FieldKind::Array)
                .field("verdict", FieldKind::String),
            Self::Custom(_) => OutputSchema::new().field("summary", FieldKind::String),
        }
    }

    /// All built-in roles.
    pub fn all_builtins() -> Vec<Self> {
        vec![
            Self::FactAuditor,
            Self::BrandPsychologist,
            Self::NaiveMemory,
            Self::ReputationAnalyst,
            Self::SynthesisJudge,
        ]
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FactAuditor => write!(f, "fact_auditor"),
            Self::BrandPsychologist => write!(f, "brand_psychologist"),
            Self::NaiveMemory => write!(f, "naive_memory"),
            Self::ReputationAnalyst => write!(f, "reputation_analyst"),
            Self::SynthesisJudge => write!(f, "synthesis_judge"),
            Self::Custom(name) => write!(f, "custom:{}", name),
        }
    }
}

impl FromStr for AgentRole {
    type Err = PlanError;

    /// Accepts snake_case, hyphenated and short forms; `custom:<label>` for
    /// user-defined roles.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(label) = trimmed.strip_prefix("custom:") {
            let label = label.trim();
            if label.is_empty() {
                return Err(PlanError::UnknownRole {
                    role: s.to_string(),
                });
            }
            return Ok(Self::Custom(label.to_string()));
        }
        match trimmed.to_lowercase().replace('-', "_").as_str() {
            "fact_auditor" | "facts" | "auditor" => Ok(Self::FactAuditor),
            "brand_psychologist" | "brand" | "psychologist" => Ok(Self::BrandPsychologist),
            "naive_memory" | "memory" | "memory_probe" => Ok(Self::NaiveMemory),
            "reputation_analyst" | "reputation" => Ok(Self::ReputationAnalyst),
            "synthesis_judge" | "judge" | "synthesis" => Ok(Self::SynthesisJudge),
            _ => Err(PlanError::UnknownRole {
                role: s.to_string(),
            }),
        }
    }
}

impl Serialize for AgentRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AgentRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One agent of a plan.
///
/// Static configuration: the orchestrator never mutates a spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSpec {
    pub id: String,
    pub role: AgentRole,
    pub prompt_template: String,
    pub output_schema: OutputSchema,
    /// Ids this agent waits on. Kept in declaration order, without duplicates.
    pub depends_on: Vec<String>,
}

impl AgentSpec {
    /// Create a spec with the role's default template and schema.
    pub fn new(id: &str, role: AgentRole) -> Self {
        Self {
            id: id.to_string(),
            prompt_template: templates::default_template(&role).to_string(),
            output_schema: role.default_schema(),
            role,
            depends_on: Vec::new(),
        }
    }

    /// Declare dependencies on other agents of the same plan.
    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            let id = id.into();
            if !self.depends_on.contains(&id) {
                self.depends_on.push(id);
            }
        }
        self
    }

    pub fn with_template(mut self, template: &str) -> Self {
        self.prompt_template = template.to_string();
        self
    }

    pub fn with_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = schema;
        self
    }

    pub fn has_dependencies(&self) -> bool {
        !self.depends_on.is_empty()
    }
}
