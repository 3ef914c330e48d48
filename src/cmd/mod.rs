//! CLI command implementations.
//!
//! | Module   | Commands handled |
//! |----------|------------------|
//! | `audit`  | `Audit`          |
//! | `plans`  | `Plans`          |
//! | `config` | `Config`         |

pub mod audit;
pub mod config;
pub mod plans;

pub use audit::{AuditArgs, cmd_audit};
pub use config::cmd_config;
pub use plans::cmd_plans;
