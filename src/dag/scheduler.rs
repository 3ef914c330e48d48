//! Wave scheduling and per-agent status tracking.
//!
//! A wave is the maximal set of pending agents whose dependencies all have an
//! outcome. A failed dependency resolves its dependents exactly like a
//! successful one: the failure is quoted into their prompts instead of
//! blocking them.

use crate::agent::AgentSpec;
use crate::dag::builder::{AgentGraph, AgentIndex};
use audit_common::{AgentOutcome, ErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Status of an agent during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum AgentStatus {
    /// Waiting for its dependencies or its wave
    #[default]
    Pending,
    /// Invocation in flight
    Running { wave: usize },
    /// Outcome recorded as a success
    Succeeded,
    /// Outcome recorded as a failure
    Failed { kind: ErrorKind },
}

impl AgentStatus {
    /// Check if the agent has an outcome.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed { .. })
    }
}

/// An agent with its current status.
#[derive(Debug, Clone)]
pub struct AgentNode {
    pub index: AgentIndex,
    pub status: AgentStatus,
}

/// Tracks which agents are ready, running and resolved for one run.
#[derive(Debug)]
pub struct DagScheduler<'g> {
    graph: &'g AgentGraph,
    nodes: Vec<AgentNode>,
    resolved: HashSet<AgentIndex>,
}

impl<'g> DagScheduler<'g> {
    pub fn new(graph: &'g AgentGraph) -> Self {
        let nodes = (0..graph.len())
            .map(|index| AgentNode {
                index,
                status: AgentStatus::Pending,
            })
            .collect();
        Self {
            graph,
            nodes,
            resolved: HashSet::new(),
        }
    }

    pub fn status(&self, id: &str) -> Option<&AgentStatus> {
        self.graph
            .get_index(id)
            .and_then(|i| self.nodes.get(i))
            .map(|n| &n.status)
    }

    /// Pending agents whose dependencies all have an outcome.
    pub fn ready_agents(&self) -> Vec<&'g AgentSpec> {
        let graph = self.graph;
        self.nodes
            .iter()
            .filter(|node| matches!(node.status, AgentStatus::Pending))
            .filter(|node| graph.dependencies_resolved(node.index, &self.resolved))
            .filter_map(|node| graph.get_agent(node.index))
            .collect()
    }

    pub fn mark_running(&mut self, id: &str, wave: usize) {
        if let Some(node) = self.graph.get_index(id).and_then(|i| self.nodes.get_mut(i)) {
            node.status = AgentStatus::Running { wave };
        }
    }

    /// Record that an agent has an outcome, unblocking its dependents.
    pub fn mark_resolved(&mut self, id: &str, outcome: &AgentOutcome) {
        if let Some(idx) = self.graph.get_index(id) {
            if let Some(node) = self.nodes.get_mut(idx) {
                node.status = match outcome.failure_details() {
                    None => AgentStatus::Succeeded,
                    Some(failure) => AgentStatus::Failed { kind: failure.kind },
                };
            }
            self.resolved.insert(idx);
        }
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }

    /// Ids of agents still lacking an outcome.
    pub fn unresolved_ids(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| !n.status.is_resolved())
            .filter_map(|n| self.graph.get_agent(n.index).map(|a| a.id.clone()))
            .collect()
    }
}

/// Compute execution waves for a graph.
///
/// Returns a list of waves, where each wave lists agent ids (in declaration
/// order) that run concurrently once all previous waves have completed.
pub fn compute_waves(graph: &AgentGraph) -> Vec<Vec<String>> {
    let mut waves = Vec::new();
    let mut resolved: HashSet<AgentIndex> = HashSet::new();

    loop {
        let ready: Vec<AgentIndex> = (0..graph.len())
            .filter(|i| !resolved.contains(i))
            .filter(|&i| graph.dependencies_resolved(i, &resolved))
            .collect();

        if ready.is_empty() {
            break;
        }

        waves.push(
            ready
                .iter()
                .filter_map(|&i| graph.get_agent(i).map(|a| a.id.clone()))
                .collect(),
        );
        resolved.extend(ready);
    }

    waves
}
