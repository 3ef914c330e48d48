//! Tracing subscriber setup.
//!
//! The filter comes from `SITE_AUDIT_LOG` (default `site_audit=info`). Logs go
//! to stderr, or to a daily-rolling file when a directory is given, so that
//! `--output json` on stdout stays machine readable.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "SITE_AUDIT_LOG";

const DEFAULT_FILTER: &str = "site_audit=info";
const LOG_FILE_PREFIX: &str = "site-audit.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Directory for daily-rolling log files; stderr when unset.
    pub directory: Option<PathBuf>,
    /// Filter used when `SITE_AUDIT_LOG` is unset.
    pub default_filter: Option<String>,
}

/// Keeps the non-blocking writer flushing until dropped.
pub struct Guard(#[allow(dead_code)] WorkerGuard);

fn env_filter(default: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default.unwrap_or(DEFAULT_FILTER)))
}

/// Install the global subscriber.
pub fn init_tracing(config: LogConfig) -> anyhow::Result<Guard> {
    let (writer, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX))
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };
    let ansi = config.directory.is_none() && console::Term::stderr().is_term();
    let filter = env_filter(config.default_filter.as_deref());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(writer);

    let result = match config.format {
        LogFormat::Json => builder
            .json()
            .with_file(true)
            .with_line_number(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => builder.with_ansi(ansi).compact().try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))?;

    Ok(Guard(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_text_on_stderr() {
        let config = LogConfig::default();
        assert_eq!(config.format, LogFormat::Text);
        assert!(config.directory.is_none());
    }

    #[test]
    fn test_default_filter_parses() {
        let filter = EnvFilter::new(DEFAULT_FILTER);
        assert!(filter.to_string().contains("site_audit"));
    }
}
