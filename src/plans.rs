//! Audit plans: validated DAGs of agents.
//!
//! This module provides:
//! - `AuditPlan`, a plan whose graph has passed validation
//! - The built-in plans (`reputation`, `parallel`, `interrogation`, `full`)
//! - `PlanDef` / `AgentDef`, the configuration form of custom plans

use crate::agent::{AgentRole, AgentSpec};
use crate::dag::{AgentGraph, DagBuilder, compute_waves};
use crate::errors::PlanError;
use crate::prompt::templates;
use serde::{Deserialize, Serialize};

/// Names of the built-in plans, in the order the CLI lists them.
pub const BUILTIN_PLANS: &[&str] = &["reputation", "parallel", "interrogation", "full"];

/// The plan used when none is configured.
pub const DEFAULT_PLAN: &str = "full";

/// A validated audit plan.
///
/// Construction rejects empty plans, duplicate ids, unknown dependencies,
/// cycles and template errors, so a value of this type can always be run.
#[derive(Debug, Clone)]
pub struct AuditPlan {
    name: String,
    description: String,
    graph: AgentGraph,
    waves: Vec<Vec<String>>,
}

impl AuditPlan {
    pub fn new(name: &str, description: &str, agents: Vec<AgentSpec>) -> Result<Self, PlanError> {
        if agents.is_empty() {
            return Err(PlanError::EmptyPlan {
                plan: name.to_string(),
            });
        }

        let graph = DagBuilder::new(agents).build()?;
        let waves = compute_waves(&graph);

        Ok(Self {
            name: name.to_string(),
            description: description.to_string(),
            graph,
            waves,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn agents(&self) -> &[AgentSpec] {
        self.graph.agents()
    }

    pub fn agent(&self, id: &str) -> Option<&AgentSpec> {
        self.graph.get_agent_by_id(id)
    }

    pub fn agent_ids(&self) -> Vec<&str> {
        self.agents().iter().map(|a| a.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn graph(&self) -> &AgentGraph {
        &self.graph
    }

    /// The wave grouping the orchestrator will follow.
    pub fn waves(&self) -> &[Vec<String>] {
        &self.waves
    }
}

/// One agent of a custom plan, as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDef {
    pub id: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

/// A custom plan, as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub agents: Vec<AgentDef>,
}

impl PlanDef {
    /// Build and validate the plan.
    pub fn to_plan(&self) -> Result<AuditPlan, PlanError> {
        let agents = self
            .agents
            .iter()
            .map(|def| {
                let role: AgentRole = def.role.parse()?;
                let spec = AgentSpec::new(&def.id, role).depends_on(def.depends_on.iter().cloned());
                Ok(match &def.template {
                    Some(template) => spec.with_template(template),
                    None => spec,
                })
            })
            .collect::<Result<Vec<_>, PlanError>>()?;

        AuditPlan::new(&self.name, &self.description, agents)
    }
}

/// Build one of the built-in plans.
pub fn builtin(name: &str) -> Result<AuditPlan, PlanError> {
    match name {
        "reputation" => AuditPlan::new(
            "reputation",
            "Single reputation analyst over the scraped site",
            vec![AgentSpec::new("reputation", AgentRole::ReputationAnalyst)],
        ),
        "parallel" => AuditPlan::new(
            "parallel",
            "Fact auditor and brand psychologist in one wave",
            vec![
                AgentSpec::new("facts", AgentRole::FactAuditor),
                AgentSpec::new("brand", AgentRole::BrandPsychologist),
            ],
        ),
        "interrogation" => AuditPlan::new(
            "interrogation",
            "Memory probe, then a fact check quoting it, then a judge quoting both",
            vec![
                AgentSpec::new("memory", AgentRole::NaiveMemory),
                AgentSpec::new("fact_check", AgentRole::FactAuditor)
                    .with_template(templates::FACT_CHECK_AGAINST_MEMORY)
                    .depends_on(["memory"]),
                AgentSpec::new("judge", AgentRole::SynthesisJudge)
                    .depends_on(["memory", "fact_check"]),
            ],
        ),
        "full" => AuditPlan::new(
            "full",
            "Memory probe, fact auditor and brand psychologist in one wave",
            vec![
                AgentSpec::new("memory", AgentRole::NaiveMemory),
                AgentSpec::new("facts", AgentRole::FactAuditor),
                AgentSpec::new("brand", AgentRole::BrandPsychologist),
            ],
        ),
        other => Err(PlanError::UnknownPlan {
            name: other.to_string(),
            available: BUILTIN_PLANS.join(", "),
        }),
    }
}

/// Resolve a plan by name. Custom plans shadow built-ins of the same name.
pub fn resolve(name: &str, custom: &[PlanDef]) -> Result<AuditPlan, PlanError> {
    if let Some(def) = custom.iter().find(|p| p.name == name) {
        return def.to_plan();
    }
    if BUILTIN_PLANS.contains(&name) {
        return builtin(name);
    }
    Err(PlanError::UnknownPlan {
        name: name.to_string(),
        available: available(custom).join(", "),
    })
}

/// All plan names: built-ins first, then custom plans not shadowing one.
pub fn available(custom: &[PlanDef]) -> Vec<String> {
    let mut names: Vec<String> = BUILTIN_PLANS.iter().map(|s| s.to_string()).collect();
    for def in custom {
        if !names.contains(&def.name) {
            names.push(def.name.clone());
        }
    }
    names
}
