//! DAG orchestration for audit plans.
//!
//! A plan is a directed acyclic graph of agents. The orchestrator groups it
//! into waves and runs each wave concurrently, with a barrier between waves.
//!
//! ## Architecture
//!
//! 1. **Builder** - validates agents and their dependencies into a graph
//! 2. **Scheduler** - computes waves and tracks per-agent status
//! 3. **Executor** - the `Orchestrator`, which runs waves against a model client
//!
//! ## Example
//!
//! ```no_run
//! use site_audit::plans;
//!
//! # fn example() -> Result<(), site_audit::errors::PlanError> {
//! let plan = plans::builtin("interrogation")?;
//!
//! // Wave 0: [memory]
//! // Wave 1: [fact_check] - quotes the memory answer
//! // Wave 2: [judge] - quotes both
//! assert_eq!(plan.waves().len(), 3);
//! # Ok(())
//! # }
//! ```

mod builder;
mod executor;
mod scheduler;
mod state;

pub use builder::{AgentGraph, AgentIndex, DagBuilder};
pub use executor::{AuditEvent, Orchestrator, OrchestratorConfig, RunResult};
pub use scheduler::{AgentNode, AgentStatus, DagScheduler, compute_waves};
pub use state::{ExecutionTimer, OutcomeMap, RunSummary};
