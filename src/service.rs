//! The audit entry point: fetch, orchestrate, synthesize.

use crate::agent::ModelClient;
use crate::config::AuditConfig;
use crate::dag::{AuditEvent, Orchestrator, OrchestratorConfig, RunResult, RunSummary};
use crate::errors::{AuditCancelled, ConfigError};
use crate::fetch::{DEFAULT_FETCH_TIMEOUT_SECS, PageFetcher};
use crate::plans::AuditPlan;
use crate::synth::Synthesizer;
use audit_common::{AuditReport, ClientBrief, DEFAULT_PREVIEW_CHARS, ScrapedContent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

/// A finished audit: the report plus how the run went.
#[derive(Debug, Clone)]
pub struct AuditRun {
    pub run_id: Uuid,
    pub report: AuditReport,
    pub summary: RunSummary,
}

/// Composes the fetch collaborator, the orchestrator and the synthesizer.
///
/// Collaborators are injected once and shared by every audit; each call to
/// [`run_audit`](Self::run_audit) owns its own execution state.
pub struct AuditService {
    client: Arc<dyn ModelClient>,
    fetcher: Arc<dyn PageFetcher>,
    plan: AuditPlan,
    synthesizer: Synthesizer,
    orchestrator_config: OrchestratorConfig,
    fetch_timeout: Duration,
    preview_chars: usize,
    event_tx: Option<mpsc::Sender<AuditEvent>>,
}

impl AuditService {
    pub fn new(
        client: Arc<dyn ModelClient>,
        fetcher: Arc<dyn PageFetcher>,
        plan: AuditPlan,
    ) -> Self {
        Self {
            client,
            fetcher,
            plan,
            synthesizer: Synthesizer::default(),
            orchestrator_config: OrchestratorConfig::default(),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            preview_chars: DEFAULT_PREVIEW_CHARS,
            event_tx: None,
        }
    }

    /// Build a service from resolved configuration.
    pub fn from_config(
        config: &AuditConfig,
        client: Arc<dyn ModelClient>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Result<Self, ConfigError> {
        config.toml.check()?;
        let plan = config.plan()?;
        Ok(Self::new(client, fetcher, plan)
            .with_synthesizer(Synthesizer::new(config.toml.verdict))
            .with_max_concurrency(config.toml.orchestrator.max_concurrency)
            .with_fetch_timeout(config.fetch_timeout())
            .with_preview_chars(config.toml.fetch.preview_chars))
    }

    pub fn with_synthesizer(mut self, synthesizer: Synthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.orchestrator_config = self.orchestrator_config.with_max_concurrency(max_concurrency);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }

    /// Forward orchestration events to `tx`.
    pub fn with_event_channel(mut self, tx: mpsc::Sender<AuditEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn plan(&self) -> &AuditPlan {
        &self.plan
    }

    /// Audit `url` for `brief`. Always returns a complete report.
    pub async fn run_audit(&self, url: &str, brief: &ClientBrief) -> AuditReport {
        self.run_audit_detailed(url, brief).await.report
    }

    /// Like [`run_audit`](Self::run_audit), also returning the run summary.
    pub async fn run_audit_detailed(&self, url: &str, brief: &ClientBrief) -> AuditRun {
        let run_id = Uuid::new_v4();
        let span = info_span!("audit", %run_id, plan = self.plan.name(), url);
        async {
            let content = self.fetch_content(url).await;
            let result = self
                .orchestrator()
                .run(&self.plan, brief, &content)
                .await;
            self.conclude(run_id, result, brief, &content)
        }
        .instrument(span)
        .await
    }

    /// Audit `url`, stopping early if `token` is cancelled.
    ///
    /// A cancelled audit yields [`AuditCancelled`] and never a partial report.
    pub async fn run_audit_cancellable(
        &self,
        url: &str,
        brief: &ClientBrief,
        token: &CancellationToken,
    ) -> Result<AuditRun, AuditCancelled> {
        let run_id = Uuid::new_v4();
        let span = info_span!("audit", %run_id, plan = self.plan.name(), url);
        async {
            let content = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    warn!("Audit cancelled during page fetch");
                    return Err(AuditCancelled { completed: 0, total: self.plan.len() });
                }
                content = self.fetch_content(url) => content,
            };
            let result = self
                .orchestrator()
                .run_with_cancel(&self.plan, brief, &content, token)
                .await?;
            Ok(self.conclude(run_id, result, brief, &content))
        }
        .instrument(span)
        .await
    }

    fn orchestrator(&self) -> Orchestrator {
        let orchestrator = Orchestrator::new(self.client.clone(), self.orchestrator_config.clone());
        match &self.event_tx {
            Some(tx) => orchestrator.with_event_channel(tx.clone()),
            None => orchestrator,
        }
    }

    /// Fetch the page, degrading to unavailable content on failure.
    async fn fetch_content(&self, url: &str) -> ScrapedContent {
        match self.fetcher.fetch(url, self.fetch_timeout).await {
            Ok(snapshot) => snapshot.into_content(self.preview_chars),
            Err(err) => {
                warn!(url, error = %err, "Page fetch failed, continuing without site content");
                ScrapedContent::unavailable(url, err.to_string())
            }
        }
    }

    fn conclude(
        &self,
        run_id: Uuid,
        result: RunResult,
        brief: &ClientBrief,
        content: &ScrapedContent,
    ) -> AuditRun {
        let report = self
            .synthesizer
            .merge(&self.plan, result.outcomes, brief, content);
        info!(
            succeeded = result.summary.succeeded,
            failed = result.summary.failed,
            verdict = report.derived_verdict().unwrap_or("none"),
            "Audit complete"
        );
        AuditRun {
            run_id,
            report,
            summary: result.summary,
        }
    }
}
