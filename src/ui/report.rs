//! Plain-text rendering of an audit report.

use crate::ui::icons::{CHECK, CROSS, SEARCH, WARNING};
use audit_common::{AgentOutcome, AuditReport};
use console::style;
use serde_json::Value;
use std::fmt::Write;

/// Render `report` for a terminal.
pub fn render_report(report: &AuditReport) -> String {
    let meta = report.metadata();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{}Audit of {} for {}",
        SEARCH,
        style(&meta.url).bold(),
        style(&meta.client).bold()
    );
    if !meta.site_content_available {
        let _ = writeln!(out, "{}No site content was available", WARNING);
    }
    let _ = writeln!(
        out,
        "  Integrity: {}   Brand alignment: {}",
        meta.scores.integrity, meta.scores.brand_alignment
    );
    let _ = writeln!(out);

    match report.derived_verdict() {
        Some(verdict) => {
            let _ = writeln!(out, "{}", style(verdict).bold());
        }
        None => {
            let _ = writeln!(out, "{}", style("No verdict for this plan").dim());
        }
    }
    let _ = writeln!(out);

    for (agent, outcome) in report.per_agent() {
        match outcome {
            AgentOutcome::Success { payload } => {
                let _ = writeln!(out, "{}{}", CHECK, style(agent).green().bold());
                render_payload(&mut out, payload);
            }
            AgentOutcome::Failure { error } => {
                let _ = writeln!(
                    out,
                    "{}{} {}: {}",
                    CROSS,
                    style(agent).red().bold(),
                    error.kind,
                    error.message
                );
            }
        }
    }

    out
}

fn render_payload(out: &mut String, payload: &Value) {
    let Some(fields) = payload.as_object() else {
        let _ = writeln!(out, "    {}", payload);
        return;
    };
    for (key, value) in fields {
        match value {
            Value::String(s) => {
                let _ = writeln!(out, "    {}: {}", style(key).dim(), s);
            }
            Value::Array(items) => {
                let _ = writeln!(out, "    {}:", style(key).dim());
                for item in items {
                    let text = item.as_str().map_or_else(|| item.to_string(), str::to_string);
                    let _ = writeln!(out, "      - {}", text);
                }
            }
            Value::Object(map) => {
                let _ = writeln!(out, "    {}:", style(key).dim());
                for (k, v) in map {
                    let text = v.as_str().map_or_else(|| v.to_string(), str::to_string);
                    let _ = writeln!(out, "      {}: {}", k, text);
                }
            }
            other => {
                let _ = writeln!(out, "    {}: {}", style(key).dim(), other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_common::{ErrorKind, ReportMetadata, ReportScores, ScoreValue};
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_render_lists_every_agent() {
        let mut per_agent = BTreeMap::new();
        per_agent.insert(
            "brand".to_string(),
            AgentOutcome::success(json!({"alignment_score": 70, "strengths": ["clear"]})),
        );
        per_agent.insert(
            "facts".to_string(),
            AgentOutcome::failure(ErrorKind::MalformedOutput, "not JSON"),
        );
        let report = AuditReport::new(
            per_agent,
            Some("Mixed (70/100): partly reliable.".to_string()),
            ReportMetadata {
                client: "Acme".to_string(),
                url: "https://acme.test".to_string(),
                site_content_available: false,
                scores: ReportScores {
                    integrity: ScoreValue::Unavailable,
                    brand_alignment: ScoreValue::Score(70),
                },
            },
        );

        let text = console::strip_ansi_codes(&render_report(&report)).to_string();

        assert!(text.contains("Mixed (70/100)"));
        assert!(text.contains("brand"));
        assert!(text.contains("- clear"));
        assert!(text.contains("not JSON"));
        assert!(text.contains("No site content was available"));
    }
}
