//! Run one audit: `site-audit audit`.

use anyhow::{Context, Result, anyhow};
use audit_common::ClientBrief;
use console::style;
use site_audit::config::{AuditConfig, CliOverrides};
use site_audit::fetch::HttpPageFetcher;
use site_audit::model::{HttpModelClient, ModelSettings};
use site_audit::service::AuditService;
use site_audit::ui::{AuditUI, UiMode, render_report};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::super::Cli;

/// Arguments of the `audit` command.
pub struct AuditArgs {
    pub url: String,
    pub client: String,
    pub industry: String,
    pub goals: String,
    pub plan: Option<String>,
    pub model: Option<String>,
    pub max_concurrency: Option<usize>,
    pub json: bool,
    pub ui: UiMode,
}

pub async fn cmd_audit(cli: &Cli, args: AuditArgs) -> Result<()> {
    let config = AuditConfig::load(cli.config.as_deref())?.with_cli(CliOverrides {
        plan: args.plan,
        model: args.model,
        max_concurrency: args.max_concurrency,
    });
    for warning in config.validate() {
        eprintln!("{} {}", style("warning:").yellow().bold(), warning);
    }

    let brief = ClientBrief::new(args.client, args.industry, args.goals)?;
    let api_key = config.api_key().ok_or_else(|| {
        anyhow!(
            "No model API key: set the {} environment variable",
            config.toml.model.api_key_env
        )
    })?;

    let client = HttpModelClient::new(ModelSettings {
        endpoint: config.toml.model.endpoint.clone(),
        model: config.toml.model.name.clone(),
        api_key,
        timeout: config.model_timeout(),
        temperature: config.toml.model.temperature,
    })?;
    let fetcher = HttpPageFetcher::new()?;

    let (tx, mut rx) = mpsc::channel(64);
    let service = AuditService::from_config(&config, Arc::new(client), Arc::new(fetcher))
        .context("Invalid audit configuration")?
        .with_event_channel(tx);

    let mut ui = AuditUI::new(service.plan().name(), service.plan().len(), args.ui);
    let ui_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            ui.handle_event(&event);
        }
    });

    let token = CancellationToken::new();
    let ctrl_c = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        })
    };

    let result = service
        .run_audit_cancellable(&args.url, &brief, &token)
        .await;
    ctrl_c.abort();
    drop(service);
    let _ = ui_task.await;

    let run = result?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&run.report)?);
    } else {
        println!();
        print!("{}", render_report(&run.report));
        println!();
        println!("{}", style(format!("Run {}", run.run_id)).dim());
    }

    Ok(())
}
