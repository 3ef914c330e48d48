//! The orchestrator: runs an audit plan wave by wave.
//!
//! Every agent of a wave is invoked concurrently and the orchestrator waits
//! for all of them before the next wave starts. Outcomes are recorded as
//! they complete. A failure never cancels siblings or later waves; it is
//! quoted into dependent prompts instead.

use crate::agent::{AgentInvoker, ModelClient};
use crate::dag::scheduler::DagScheduler;
use crate::dag::state::{ExecutionTimer, OutcomeMap, RunSummary};
use crate::errors::AuditCancelled;
use crate::plans::AuditPlan;
use crate::prompt::PromptBuilder;
use audit_common::{AgentOutcome, ClientBrief, ErrorKind, ScrapedContent};
use futures::StreamExt;
use futures::stream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

/// Events emitted during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A wave of agents has started.
    WaveStarted { wave: usize, agents: Vec<String> },
    /// An agent invocation has started.
    AgentStarted {
        agent: String,
        role: String,
        wave: usize,
    },
    /// An agent has an outcome.
    AgentCompleted {
        agent: String,
        wave: usize,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_kind: Option<ErrorKind>,
        duration_ms: u64,
    },
    /// Every agent of a wave has an outcome.
    WaveCompleted {
        wave: usize,
        succeeded: usize,
        failed: usize,
    },
    /// The run finished with a complete outcome map.
    RunCompleted { summary: RunSummary },
    /// The caller cancelled the run.
    RunCancelled { completed: usize, total: usize },
}

/// Configuration for the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    /// Cap on in-flight invocations within one wave (0 = whole wave).
    pub max_concurrency: usize,
}

impl OrchestratorConfig {
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    fn limit_for(&self, wave_len: usize) -> usize {
        if self.max_concurrency == 0 {
            wave_len.max(1)
        } else {
            self.max_concurrency.min(wave_len.max(1))
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// One outcome per agent of the plan.
    pub outcomes: OutcomeMap,
    pub summary: RunSummary,
}

/// Runs plans against a model client.
///
/// Holds no per-run state, so one orchestrator can serve concurrent audits.
pub struct Orchestrator {
    invoker: AgentInvoker,
    config: OrchestratorConfig,
    event_tx: Option<mpsc::Sender<AuditEvent>>,
}

impl Orchestrator {
    pub fn new(client: Arc<dyn ModelClient>, config: OrchestratorConfig) -> Self {
        Self {
            invoker: AgentInvoker::new(client),
            config,
            event_tx: None,
        }
    }

    /// Set the event channel for progress updates.
    pub fn with_event_channel(mut self, tx: mpsc::Sender<AuditEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Run every agent of the plan. Never fails: each agent ends with an outcome.
    pub async fn run(
        &self,
        plan: &AuditPlan,
        brief: &ClientBrief,
        content: &ScrapedContent,
    ) -> RunResult {
        let mut outcomes = OutcomeMap::new();
        let mut summary = RunSummary::new(plan.name(), plan.len());
        self.execute(plan, brief, content, &mut outcomes, &mut summary)
            .await;
        self.finish(outcomes, summary).await
    }

    /// Run the plan until it completes or the token is cancelled.
    ///
    /// On cancellation in-flight invocations are dropped at the transport
    /// boundary and no outcome map is returned.
    pub async fn run_with_cancel(
        &self,
        plan: &AuditPlan,
        brief: &ClientBrief,
        content: &ScrapedContent,
        token: &CancellationToken,
    ) -> Result<RunResult, AuditCancelled> {
        let mut outcomes = OutcomeMap::new();
        let mut summary = RunSummary::new(plan.name(), plan.len());

        let cancelled = tokio::select! {
            biased;
            _ = token.cancelled() => true,
            _ = self.execute(plan, brief, content, &mut outcomes, &mut summary) => false,
        };

        if cancelled {
            let completed = outcomes.len();
            warn!(completed, total = plan.len(), "Audit cancelled");
            self.emit(AuditEvent::RunCancelled {
                completed,
                total: plan.len(),
            })
            .await;
            return Err(AuditCancelled {
                completed,
                total: plan.len(),
            });
        }

        Ok(self.finish(outcomes, summary).await)
    }

    async fn execute(
        &self,
        plan: &AuditPlan,
        brief: &ClientBrief,
        content: &ScrapedContent,
        outcomes: &mut OutcomeMap,
        summary: &mut RunSummary,
    ) {
        let timer = ExecutionTimer::start();
        let mut scheduler = DagScheduler::new(plan.graph());
        let mut wave = 0;

        info!(
            plan = plan.name(),
            agents = plan.len(),
            waves = plan.waves().len(),
            "Running audit plan"
        );

        loop {
            let ready = scheduler.ready_agents();
            if ready.is_empty() {
                break;
            }

            let ids: Vec<String> = ready.iter().map(|a| a.id.clone()).collect();
            debug!(wave, agents = ?ids, "Wave started");
            self.emit(AuditEvent::WaveStarted {
                wave,
                agents: ids.clone(),
            })
            .await;

            // Prompts are built against the outcomes of earlier waves only.
            let calls: Vec<_> = ready
                .iter()
                .map(|spec| {
                    let prompt = PromptBuilder::build(spec, brief, content, &*outcomes);
                    scheduler.mark_running(&spec.id, wave);
                    (*spec, prompt)
                })
                .collect();

            let mut in_flight = stream::iter(calls.into_iter().map(move |(spec, prompt)| {
                let span = info_span!("agent", agent = %spec.id, role = %spec.role, wave);
                async move {
                    self.emit(AuditEvent::AgentStarted {
                        agent: spec.id.clone(),
                        role: spec.role.to_string(),
                        wave,
                    })
                    .await;
                    let timer = ExecutionTimer::start();
                    let outcome = self.invoker.invoke(&prompt).await;
                    (spec.id.clone(), outcome, timer.elapsed())
                }
                .instrument(span)
            }))
            .buffer_unordered(self.config.limit_for(ids.len()));

            let (mut succeeded, mut failed) = (0, 0);
            while let Some((id, outcome, elapsed)) = in_flight.next().await {
                self.record(&id, &outcome, wave, elapsed).await;
                if outcome.is_success() {
                    succeeded += 1;
                } else {
                    failed += 1;
                }
                summary.record(&outcome);
                scheduler.mark_resolved(&id, &outcome);
                let previous = outcomes.insert(id, outcome);
                debug_assert!(previous.is_none(), "agent ids are unique within a plan");
            }

            self.emit(AuditEvent::WaveCompleted {
                wave,
                succeeded,
                failed,
            })
            .await;
            debug!(wave, resolved = scheduler.resolved_count(), "Wave completed");
            wave += 1;
        }

        // Only reachable if the graph admitted an agent no wave could pick up.
        for id in scheduler.unresolved_ids() {
            warn!(agent = %id, "Agent was never scheduled");
            let outcome =
                AgentOutcome::failure(ErrorKind::TransportError, "agent was never scheduled");
            summary.record(&outcome);
            outcomes.insert(id, outcome);
        }

        summary.waves = wave;
        summary.duration = timer.elapsed();
    }

    async fn record(&self, id: &str, outcome: &AgentOutcome, wave: usize, elapsed: Duration) {
        let error_kind = outcome.failure_details().map(|f| f.kind);
        match outcome.failure_details() {
            None => info!(agent = id, wave, elapsed_ms = elapsed.as_millis() as u64, "Agent succeeded"),
            Some(failure) => warn!(
                agent = id,
                wave,
                kind = %failure.kind,
                error = %failure.message,
                "Agent failed"
            ),
        }
        self.emit(AuditEvent::AgentCompleted {
            agent: id.to_string(),
            wave,
            success: outcome.is_success(),
            error_kind,
            duration_ms: elapsed.as_millis() as u64,
        })
        .await;
    }

    async fn finish(&self, outcomes: OutcomeMap, summary: RunSummary) -> RunResult {
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            waves = summary.waves,
            duration_ms = summary.duration.as_millis() as u64,
            "Audit plan finished"
        );
        self.emit(AuditEvent::RunCompleted {
            summary: summary.clone(),
        })
        .await;

        RunResult { outcomes, summary }
    }

    /// Emit an event to the event channel if configured.
    async fn emit(&self, event: AuditEvent) {
        if let Some(ref tx) = self.event_tx {
            tx.send(event).await.ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentRole, AgentSpec};
    use crate::errors::InvokeError;
    use crate::prompt::UPSTREAM_FAILED_MARKER;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers every prompt with a payload valid for any built-in role, and
    /// fails prompts containing a trigger phrase.
    struct EchoClient {
        fail_on: Option<&'static str>,
        prompts: Mutex<Vec<String>>,
    }

    impl EchoClient {
        fn new(fail_on: Option<&'static str>) -> Self {
            Self {
                fail_on,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ModelClient for EchoClient {
        async fn invoke(&self, prompt: &str, _schema_hint: &str) -> Result<String, InvokeError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if let Some(trigger) = self.fail_on
                && prompt.contains(trigger)
            {
                return Err(InvokeError::Network("connection reset".to_string()));
            }
            Ok(r#"{"summary": "ok"}"#.to_string())
        }
    }

    fn custom(id: &str, template: &str, deps: Vec<&str>) -> AgentSpec {
        AgentSpec::new(id, AgentRole::Custom(id.to_string()))
            .with_template(template)
            .depends_on(deps)
    }

    fn brief() -> ClientBrief {
        ClientBrief::new("Acme", "retail", "").unwrap()
    }

    fn content() -> ScrapedContent {
        ScrapedContent::new("https://acme.test", "Acme", "", "Welcome", 100)
    }

    #[tokio::test]
    async fn test_chain_quotes_failed_upstream() {
        let plan = AuditPlan::new(
            "chain",
            "",
            vec![
                custom("one", "FIRST {client_name}", vec![]),
                custom("two", "SECOND {prior:one}", vec!["one"]),
                custom("three", "THIRD {prior:two}", vec!["two"]),
            ],
        )
        .unwrap();
        let client = Arc::new(EchoClient::new(Some("FIRST")));
        let orchestrator = Orchestrator::new(client.clone(), OrchestratorConfig::default());

        let result = orchestrator.run(&plan, &brief(), &content()).await;

        assert_eq!(result.outcomes.len(), 3);
        assert!(!result.outcomes["one"].is_success());
        assert!(result.outcomes["two"].is_success());
        assert_eq!(result.summary.waves, 3);

        let prompts = client.prompts.lock().unwrap();
        let second = prompts.iter().find(|p| p.starts_with("SECOND")).unwrap();
        assert!(second.contains(UPSTREAM_FAILED_MARKER));
        assert!(!second.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_events_follow_wave_order() {
        let plan = AuditPlan::new(
            "pair",
            "",
            vec![
                custom("a", "A {client_name}", vec![]),
                custom("b", "B {client_name}", vec![]),
                custom("c", "C {prior:a}", vec!["a", "b"]),
            ],
        )
        .unwrap();
        let (tx, mut rx) = mpsc::channel(64);
        let orchestrator =
            Orchestrator::new(Arc::new(EchoClient::new(None)), OrchestratorConfig::default())
                .with_event_channel(tx);

        let result = orchestrator.run(&plan, &brief(), &content()).await;
        drop(orchestrator);
        assert!(result.summary.all_success());

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        let wave_starts: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                AuditEvent::WaveStarted { wave, .. } => Some(*wave),
                _ => None,
            })
            .collect();
        assert_eq!(wave_starts, vec![0, 1]);
        assert!(matches!(events.last(), Some(AuditEvent::RunCompleted { .. })));
    }

    #[tokio::test]
    async fn test_agent_events_carry_their_wave() {
        let plan = AuditPlan::new(
            "chain",
            "",
            vec![
                custom("a", "A {client_name}", vec![]),
                custom("b", "B {prior:a}", vec!["a"]),
                custom("c", "C {prior:b}", vec!["b"]),
            ],
        )
        .unwrap();
        let (tx, mut rx) = mpsc::channel(64);
        let orchestrator =
            Orchestrator::new(Arc::new(EchoClient::new(None)), OrchestratorConfig::default())
                .with_event_channel(tx);

        orchestrator.run(&plan, &brief(), &content()).await;
        drop(orchestrator);

        let mut started = Vec::new();
        let mut completed = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                AuditEvent::AgentStarted { agent, wave, .. } => started.push((agent, wave)),
                AuditEvent::AgentCompleted { agent, wave, .. } => completed.push((agent, wave)),
                _ => {}
            }
        }
        let expected = vec![
            ("a".to_string(), 0),
            ("b".to_string(), 1),
            ("c".to_string(), 2),
        ];
        assert_eq!(started, expected);
        assert_eq!(completed, expected);
    }

    #[tokio::test]
    async fn test_bounded_concurrency_still_runs_everything() {
        let plan = crate::plans::builtin("full").unwrap();
        let orchestrator = Orchestrator::new(
            Arc::new(EchoClient::new(None)),
            OrchestratorConfig::default().with_max_concurrency(1),
        );

        let result = orchestrator.run(&plan, &brief(), &content()).await;

        // The echo payload lacks the role fields, so every outcome is a schema failure.
        assert_eq!(result.outcomes.len(), 3);
        assert_eq!(result.summary.failed, 3);
        assert!(
            result
                .outcomes
                .values()
                .all(|o| o.failure_details().unwrap().kind == ErrorKind::MalformedOutput)
        );
    }

    #[tokio::test]
    async fn test_cancelled_run_reports_cancellation() {
        let plan = crate::plans::builtin("parallel").unwrap();
        let orchestrator =
            Orchestrator::new(Arc::new(EchoClient::new(None)), OrchestratorConfig::default());
        let token = CancellationToken::new();
        token.cancel();

        let err = orchestrator
            .run_with_cancel(&plan, &brief(), &content(), &token)
            .await
            .unwrap_err();

        assert_eq!(err.total, 2);
        assert_eq!(err.completed, 0);
    }

    #[test]
    fn test_concurrency_limit() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.limit_for(3), 3);
        assert_eq!(config.clone().with_max_concurrency(2).limit_for(3), 2);
        assert_eq!(config.with_max_concurrency(8).limit_for(3), 3);
    }

    #[test]
    fn test_event_serialization() {
        let event = AuditEvent::AgentStarted {
            agent: "facts".to_string(),
            role: "fact_auditor".to_string(),
            wave: 0,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"agent_started\""));
        assert!(json.contains("facts"));
    }
}
