pub mod audit_progress;
pub mod icons;
pub mod report;

pub use audit_progress::{AuditUI, UiMode};
pub use report::render_report;
