//! Plan graph construction and validation.
//!
//! The builder takes the agents of a plan and constructs a directed acyclic
//! graph. Everything that could make a plan unrunnable is rejected here, at
//! plan-construction time, so no error of this class can occur mid-audit.

use crate::agent::AgentSpec;
use crate::errors::PlanError;
use crate::prompt::{PLACEHOLDERS, Placeholder, placeholders_in};
use std::collections::{HashMap, HashSet};

/// Index into the agent list.
pub type AgentIndex = usize;

const PRIOR_OPEN: &str = "{prior:";

/// Agent ids double as `{prior:<id>}` references, so they share its alphabet.
fn is_valid_agent_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// A validated directed acyclic graph of agents.
#[derive(Debug, Clone)]
pub struct AgentGraph {
    /// Agents indexed by their position
    agents: Vec<AgentSpec>,
    /// Map from agent id to index
    index_map: HashMap<String, AgentIndex>,
    /// Forward edges: index -> agents that depend on it
    forward_edges: Vec<Vec<AgentIndex>>,
    /// Reverse edges: index -> agents it depends on
    reverse_edges: Vec<Vec<AgentIndex>>,
}

impl AgentGraph {
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn get_agent(&self, index: AgentIndex) -> Option<&AgentSpec> {
        self.agents.get(index)
    }

    pub fn get_agent_by_id(&self, id: &str) -> Option<&AgentSpec> {
        self.index_map.get(id).and_then(|&i| self.agents.get(i))
    }

    pub fn get_index(&self, id: &str) -> Option<AgentIndex> {
        self.index_map.get(id).copied()
    }

    pub fn agents(&self) -> &[AgentSpec] {
        &self.agents
    }

    /// Agents that depend on the given agent.
    pub fn dependents(&self, index: AgentIndex) -> &[AgentIndex] {
        self.forward_edges.get(index).map_or(&[], |v| v.as_slice())
    }

    /// Agents the given agent depends on.
    pub fn dependencies(&self, index: AgentIndex) -> &[AgentIndex] {
        self.reverse_edges.get(index).map_or(&[], |v| v.as_slice())
    }

    /// Check whether every dependency of an agent has an outcome.
    pub fn dependencies_resolved(&self, index: AgentIndex, resolved: &HashSet<AgentIndex>) -> bool {
        self.dependencies(index)
            .iter()
            .all(|dep| resolved.contains(dep))
    }
}

/// Builder for agent graphs.
pub struct DagBuilder {
    agents: Vec<AgentSpec>,
}

impl DagBuilder {
    pub fn new(agents: Vec<AgentSpec>) -> Self {
        Self { agents }
    }

    /// Build and validate the graph.
    ///
    /// - Agent ids must be non-empty and quotable as `{prior:<id>}`
    /// - Agent ids must be unique (concurrent outcome writes rely on it)
    /// - Every dependency must name an agent of the plan
    /// - Templates may only use known placeholders, and may only quote
    ///   `{prior:<id>}` for declared dependencies
    /// - No cycles
    pub fn build(self) -> Result<AgentGraph, PlanError> {
        let mut index_map = HashMap::new();
        for (i, agent) in self.agents.iter().enumerate() {
            if !is_valid_agent_id(&agent.id) {
                return Err(PlanError::InvalidId {
                    id: agent.id.clone(),
                });
            }
            if index_map.insert(agent.id.clone(), i).is_some() {
                return Err(PlanError::DuplicateId {
                    id: agent.id.clone(),
                });
            }
        }

        let mut forward_edges: Vec<Vec<AgentIndex>> = vec![Vec::new(); self.agents.len()];
        let mut reverse_edges: Vec<Vec<AgentIndex>> = vec![Vec::new(); self.agents.len()];

        for (to_idx, agent) in self.agents.iter().enumerate() {
            for dep in &agent.depends_on {
                let from_idx =
                    *index_map
                        .get(dep)
                        .ok_or_else(|| PlanError::UnknownDependency {
                            agent: agent.id.clone(),
                            dependency: dep.clone(),
                        })?;

                forward_edges[from_idx].push(to_idx);
                reverse_edges[to_idx].push(from_idx);
            }
            Self::validate_template(agent)?;
        }

        let graph = AgentGraph {
            agents: self.agents,
            index_map,
            forward_edges,
            reverse_edges,
        };

        Self::validate_no_cycles(&graph)?;

        Ok(graph)
    }

    fn validate_template(agent: &AgentSpec) -> Result<(), PlanError> {
        // A reference the placeholder syntax cannot parse would reach the model verbatim.
        let template = &agent.prompt_template;
        for (start, _) in template.match_indices(PRIOR_OPEN) {
            let rest = &template[start + PRIOR_OPEN.len()..];
            match rest.split_once('}') {
                Some((reference, _)) if is_valid_agent_id(reference) => {}
                Some((reference, _)) => {
                    return Err(PlanError::MalformedReference {
                        agent: agent.id.clone(),
                        reference: reference.to_string(),
                    });
                }
                None => {
                    return Err(PlanError::MalformedReference {
                        agent: agent.id.clone(),
                        reference: rest.to_string(),
                    });
                }
            }
        }

        for placeholder in placeholders_in(&agent.prompt_template) {
            match placeholder {
                Placeholder::Field(name) if !PLACEHOLDERS.contains(&name.as_str()) => {
                    return Err(PlanError::UnknownPlaceholder {
                        agent: agent.id.clone(),
                        placeholder: name,
                    });
                }
                Placeholder::Prior(reference) if !agent.depends_on.contains(&reference) => {
                    return Err(PlanError::UndeclaredReference {
                        agent: agent.id.clone(),
                        reference,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Validate that the graph has no cycles using Kahn's algorithm.
    fn validate_no_cycles(graph: &AgentGraph) -> Result<(), PlanError> {
        let mut in_degree: Vec<usize> = graph.reverse_edges.iter().map(|deps| deps.len()).collect();

        let mut queue: Vec<AgentIndex> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, deg)| *deg == 0)
            .map(|(i, _)| i)
            .collect();

        let mut processed = 0;

        while let Some(node) = queue.pop() {
            processed += 1;

            for &dependent in graph.dependents(node) {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push(dependent);
                }
            }
        }

        if processed != graph.len() {
            let agents: Vec<String> = in_degree
                .iter()
                .enumerate()
                .filter(|&(_, deg)| *deg > 0)
                .filter_map(|(i, _)| graph.get_agent(i).map(|a| a.id.clone()))
                .collect();

            return Err(PlanError::Cycle { agents });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentRole;

    fn agent(id: &str, deps: Vec<&str>) -> AgentSpec {
        AgentSpec::new(id, AgentRole::Custom(id.to_string()))
            .with_template("{client_name}")
            .depends_on(deps)
    }

    #[test]
    fn test_build_simple_graph() {
        let agents = vec![
            agent("memory", vec![]),
            agent("facts", vec![]),
            agent("judge", vec!["memory", "facts"]),
        ];

        let graph = DagBuilder::new(agents).build().unwrap();

        assert_eq!(graph.len(), 3);
        assert!(graph.dependencies(0).is_empty());
        assert!(graph.dependencies(1).is_empty());
        assert_eq!(graph.dependencies(2), &[0, 1]);
        assert_eq!(graph.dependents(0), &[2]);
        assert_eq!(graph.get_agent_by_id("judge").unwrap().id, "judge");
    }

    #[test]
    fn test_cycle_detection() {
        let agents = vec![
            agent("a", vec!["c"]),
            agent("b", vec!["a"]),
            agent("c", vec!["b"]),
        ];

        let err = DagBuilder::new(agents).build().unwrap_err();
        match err {
            PlanError::Cycle { agents } => assert_eq!(agents.len(), 3),
            other => panic!("Expected Cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let err = DagBuilder::new(vec![agent("a", vec!["a"])]).build().unwrap_err();
        assert!(matches!(err, PlanError::Cycle { .. }));
    }

    #[test]
    fn test_missing_dependency() {
        let err = DagBuilder::new(vec![agent("a", vec!["nonexistent"])])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("nonexistent"));
    }

    #[test]
    fn test_duplicate_id() {
        let err = DagBuilder::new(vec![agent("a", vec![]), agent("a", vec![])])
            .build()
            .unwrap_err();
        assert_eq!(err, PlanError::DuplicateId { id: "a".to_string() });
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let spec = agent("a", vec![]).with_template("Hello {client}");
        let err = DagBuilder::new(vec![spec]).build().unwrap_err();
        assert!(matches!(err, PlanError::UnknownPlaceholder { placeholder, .. } if placeholder == "client"));
    }

    #[test]
    fn test_undeclared_prior_reference_rejected() {
        let specs = vec![
            agent("memory", vec![]),
            agent("facts", vec![]).with_template("Claims: {prior:memory}"),
        ];
        let err = DagBuilder::new(specs).build().unwrap_err();
        assert!(matches!(err, PlanError::UndeclaredReference { reference, .. } if reference == "memory"));
    }

    #[test]
    fn test_invalid_ids_rejected() {
        for id in ["", "fact check", "judge!", "{x}"] {
            let err = DagBuilder::new(vec![agent(id, vec![])]).build().unwrap_err();
            assert_eq!(err, PlanError::InvalidId { id: id.to_string() }, "id {id:?}");
        }

        let ok = vec![agent("fact_check-2.v1", vec![])];
        assert!(DagBuilder::new(ok).build().is_ok());
    }

    #[test]
    fn test_malformed_prior_reference_rejected() {
        let specs = vec![
            agent("memory", vec![]),
            agent("facts", vec!["memory"]).with_template("Quote: {prior:undeclared thing}"),
        ];
        let err = DagBuilder::new(specs).build().unwrap_err();
        assert_eq!(
            err,
            PlanError::MalformedReference {
                agent: "facts".to_string(),
                reference: "undeclared thing".to_string(),
            }
        );

        let unterminated = vec![
            agent("memory", vec![]),
            agent("facts", vec!["memory"]).with_template("Quote: {prior:memory"),
        ];
        let err = DagBuilder::new(unterminated).build().unwrap_err();
        assert!(matches!(err, PlanError::MalformedReference { .. }));
    }

    #[test]
    fn test_dependencies_resolved() {
        let agents = vec![
            agent("a", vec![]),
            agent("b", vec!["a"]),
            agent("c", vec!["a", "b"]),
        ];

        let graph = DagBuilder::new(agents).build().unwrap();
        let mut resolved = HashSet::new();

        assert!(graph.dependencies_resolved(0, &resolved));
        assert!(!graph.dependencies_resolved(1, &resolved));

        resolved.insert(0);
        assert!(graph.dependencies_resolved(1, &resolved));
        assert!(!graph.dependencies_resolved(2, &resolved));

        resolved.insert(1);
        assert!(graph.dependencies_resolved(2, &resolved));
    }
}
