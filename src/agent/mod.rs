//! Agents: role-scoped questions asked of the generative model.
//!
//! - [`spec`]: `AgentSpec` and `AgentRole`, the static plan building blocks
//! - [`schema`]: `OutputSchema`, the expected shape of each agent's JSON answer
//! - [`invoker`]: `AgentInvoker`, the boundary that turns one model call into
//!   one `AgentOutcome`

pub mod invoker;
pub mod schema;
pub mod spec;

pub use invoker::{AgentInvoker, ModelClient, classify_invoke_error, parse_output};
pub use schema::{FieldKind, OutputSchema, SchemaField, parse_score};
pub use spec::{AgentRole, AgentSpec, DerivedScore, FACT_CHECKLIST};
