pub mod agent;
pub mod config;
pub mod dag;
pub mod errors;
pub mod fetch;
pub mod logging;
pub mod model;
pub mod plans;
pub mod prompt;
pub mod service;
pub mod synth;
pub mod ui;

#[doc(hidden)]
pub mod testing;

pub use errors::{AuditCancelled, ConfigError, FetchError, InvokeError, PlanError};
pub use service::{AuditRun, AuditService};
