use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use site_audit::logging::{LogConfig, LogFormat, init_tracing};
use site_audit::ui::UiMode;
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "site-audit")]
#[command(version, about = "Multi-agent web presence auditor")]
pub struct Cli {
    /// Path to the configuration file (default: ./site-audit.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log format on stderr
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    /// Write logs to daily-rolling files in this directory instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Verbose logging (site_audit=debug unless SITE_AUDIT_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Audit a website for a client
    Audit {
        /// URL of the site to audit
        #[arg(short, long)]
        url: String,

        /// Client name
        #[arg(long)]
        client: String,

        /// Client industry
        #[arg(long, default_value = "")]
        industry: String,

        /// What the client wants the site to achieve
        #[arg(long, default_value = "")]
        goals: String,

        /// Plan to run (overrides config and SITE_AUDIT_PLAN)
        #[arg(short, long)]
        plan: Option<String>,

        /// Model name (overrides config and SITE_AUDIT_MODEL)
        #[arg(long)]
        model: Option<String>,

        /// Cap on concurrent model calls per wave (0 = whole wave)
        #[arg(long)]
        max_concurrency: Option<usize>,

        /// Report format on stdout
        #[arg(short, long, value_enum, default_value = "text")]
        output: OutputFormat,

        /// Progress display on stderr
        #[arg(long, value_enum, default_value = "full")]
        ui: UiMode,
    },
    /// List available plans and their waves
    Plans,
    /// View or manage configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate the configuration and list warnings
    Validate,
    /// Write a commented site-audit.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let _guard = init_tracing(LogConfig {
        format: cli.log_format,
        directory: cli.log_dir.clone(),
        default_filter: cli.verbose.then(|| "site_audit=debug".to_string()),
    })?;

    match &cli.command {
        Commands::Audit {
            url,
            client,
            industry,
            goals,
            plan,
            model,
            max_concurrency,
            output,
            ui,
        } => {
            cmd::cmd_audit(
                &cli,
                cmd::AuditArgs {
                    url: url.clone(),
                    client: client.clone(),
                    industry: industry.clone(),
                    goals: goals.clone(),
                    plan: plan.clone(),
                    model: model.clone(),
                    max_concurrency: *max_concurrency,
                    json: *output == OutputFormat::Json,
                    ui: *ui,
                },
            )
            .await?;
        }
        Commands::Plans => cmd::cmd_plans(&cli)?,
        Commands::Config { command } => cmd::cmd_config(&cli, command.clone())?,
    }

    Ok(())
}
