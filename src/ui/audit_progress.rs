//! Audit progress UI.
//!
//! Renders orchestration events on stderr so a JSON report on stdout stays
//! clean. Output modes:
//! - `full`: a spinner per agent plus wave headers
//! - `minimal`: one line per wave and per agent outcome
//! - `json`: one JSON event per line
//! - `quiet`: nothing

use crate::dag::{AuditEvent, RunSummary};
use crate::ui::icons::{CHECK, CLOCK, CROSS, RUNNING, SPARKLE, WAVE};
use audit_common::ErrorKind;
use console::{Term, style};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

/// Output mode for the progress UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum UiMode {
    #[default]
    Full,
    Minimal,
    Json,
    Quiet,
}

impl std::str::FromStr for UiMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "minimal" => Self::Minimal,
            "quiet" | "none" => Self::Quiet,
            _ => Self::Full,
        })
    }
}

impl UiMode {
    pub fn parse(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("  {spinner:.cyan} {prefix:.bold} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn header_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:.bold} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}

/// Terminal renderer for [`AuditEvent`]s.
///
/// Owned by the single task draining the event channel.
pub struct AuditUI {
    mode: UiMode,
    multi: MultiProgress,
    header_bar: ProgressBar,
    agent_bars: HashMap<String, ProgressBar>,
    term: Term,
}

impl AuditUI {
    pub fn new(plan: &str, total_agents: usize, mode: UiMode) -> Self {
        let multi = MultiProgress::with_draw_target(match mode {
            UiMode::Full => ProgressDrawTarget::stderr(),
            _ => ProgressDrawTarget::hidden(),
        });

        let header_bar = multi.add(ProgressBar::new(total_agents as u64));
        header_bar.set_style(header_style());
        header_bar.set_prefix(plan.to_string());
        header_bar.set_message("starting");

        Self {
            mode,
            multi,
            header_bar,
            agent_bars: HashMap::new(),
            term: Term::stderr(),
        }
    }

    pub fn handle_event(&mut self, event: &AuditEvent) {
        match self.mode {
            UiMode::Quiet => {}
            UiMode::Json => self.handle_json(event),
            UiMode::Minimal => self.handle_minimal(event),
            UiMode::Full => self.handle_full(event),
        }
    }

    fn handle_json(&self, event: &AuditEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(&self.term, "{}", json);
        }
    }

    fn handle_minimal(&self, event: &AuditEvent) {
        match event {
            AuditEvent::WaveStarted { wave, agents } => {
                let _ = writeln!(&self.term, "Wave {}: {}", wave, agents.join(", "));
            }
            AuditEvent::AgentCompleted {
                agent,
                success,
                error_kind,
                ..
            } => {
                if *success {
                    let _ = writeln!(&self.term, "✓ {}", agent);
                } else {
                    let _ = writeln!(&self.term, "✗ {} ({})", agent, kind_label(error_kind));
                }
            }
            AuditEvent::RunCompleted { summary } => {
                let _ = writeln!(
                    &self.term,
                    "Done: {}/{} agents succeeded",
                    summary.succeeded, summary.total_agents
                );
            }
            AuditEvent::RunCancelled { completed, total } => {
                let _ = writeln!(&self.term, "Cancelled after {}/{} agents", completed, total);
            }
            _ => {}
        }
    }

    fn handle_full(&mut self, event: &AuditEvent) {
        match event {
            AuditEvent::WaveStarted { wave, agents } => self.on_wave_started(*wave, agents),
            AuditEvent::AgentStarted { agent, role, .. } => self.on_agent_started(agent, role),
            AuditEvent::AgentCompleted {
                agent,
                success,
                error_kind,
                duration_ms,
                ..
            } => self.on_agent_completed(agent, *success, error_kind, *duration_ms),
            AuditEvent::WaveCompleted {
                wave,
                succeeded,
                failed,
            } => self.on_wave_completed(*wave, *succeeded, *failed),
            AuditEvent::RunCompleted { summary } => self.on_run_completed(summary),
            AuditEvent::RunCancelled { completed, total } => {
                self.clear_bars();
                self.header_bar.abandon_with_message(format!(
                    "{}",
                    style(format!("cancelled after {}/{} agents", completed, total)).yellow()
                ));
            }
        }
    }

    fn on_wave_started(&self, wave: usize, agents: &[String]) {
        self.multi
            .println(format!(
                "{} Wave {}: {}",
                WAVE,
                style(wave).yellow().bold(),
                style(agents.join(", ")).dim()
            ))
            .ok();
        self.header_bar
            .set_message(format!("wave {} ({} agents)", wave, agents.len()));
    }

    fn on_agent_started(&mut self, agent: &str, role: &str) {
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(spinner_style());
        bar.set_prefix(agent.to_string());
        bar.set_message(format!("{}{}", RUNNING, style(role).dim()));
        bar.enable_steady_tick(Duration::from_millis(100));
        self.agent_bars.insert(agent.to_string(), bar);
    }

    fn on_agent_completed(
        &mut self,
        agent: &str,
        success: bool,
        error_kind: &Option<ErrorKind>,
        duration_ms: u64,
    ) {
        if let Some(bar) = self.agent_bars.remove(agent) {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
        self.header_bar.inc(1);

        let elapsed = format_duration(Duration::from_millis(duration_ms));
        let line = if success {
            format!(
                "  {}{} {} ({})",
                CHECK,
                style(agent).green().bold(),
                style("answered").green(),
                elapsed
            )
        } else {
            format!(
                "  {}{} {}: {} ({})",
                CROSS,
                style(agent).red().bold(),
                style("failed").red(),
                kind_label(error_kind),
                elapsed
            )
        };
        self.multi.println(line).ok();
    }

    fn on_wave_completed(&self, wave: usize, succeeded: usize, failed: usize) {
        let failed_text = if failed > 0 {
            style(format!("{} failed", failed)).red().to_string()
        } else {
            style("0 failed").dim().to_string()
        };
        self.multi
            .println(format!(
                "{}Wave {} settled: {} succeeded, {}",
                if failed == 0 { CHECK } else { CROSS },
                wave,
                style(succeeded).green(),
                failed_text
            ))
            .ok();
    }

    fn on_run_completed(&mut self, summary: &RunSummary) {
        self.clear_bars();
        self.header_bar.finish_and_clear();
        let _ = writeln!(
            &self.term,
            "\n{}Plan {} finished: {}/{} agents answered in {} wave(s) {}{}",
            SPARKLE,
            style(&summary.plan).bold(),
            summary.succeeded,
            summary.total_agents,
            summary.waves,
            CLOCK,
            format_duration(summary.duration)
        );
    }

    fn clear_bars(&mut self) {
        for (_, bar) in self.agent_bars.drain() {
            bar.finish_and_clear();
        }
    }
}

fn kind_label(kind: &Option<ErrorKind>) -> &'static str {
    kind.as_ref().map_or("failed", ErrorKind::label)
}

/// Format a duration as "1.2s" or "2m 5s".
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}
