//! Configuration view and validation: `site-audit config`.

use anyhow::{Result, bail};
use site_audit::config::{AuditConfig, CONFIG_FILE, STARTER_CONFIG};
use std::path::PathBuf;

use super::super::{Cli, ConfigCommands};

pub fn cmd_config(cli: &Cli, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            let config = AuditConfig::load(cli.config.as_deref())?;

            println!();
            println!("Site Audit Configuration");
            println!("========================");
            println!();
            match &config.source {
                Some(path) => println!("Config file: {}", path.display()),
                None => println!("No {} found, using defaults", CONFIG_FILE),
            }
            println!();
            println!("Effective values (with env overrides):");
            println!();
            print!("{}", toml::to_string_pretty(&config.toml)?);
            println!();
            let key_state = if config.api_key().is_some() { "set" } else { "not set" };
            println!("API key ({}): {}", config.toml.model.api_key_env, key_state);
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let config = AuditConfig::load(cli.config.as_deref())?;
            if config.source.is_none() {
                println!("No {} found. Using defaults (valid).", CONFIG_FILE);
            }
            config.toml.check()?;
            config.plan()?;

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init { force }) => {
            let path = cli
                .config
                .clone()
                .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
            if path.exists() && !force {
                bail!(
                    "{} already exists. Pass --force to overwrite it.",
                    path.display()
                );
            }

            std::fs::write(&path, STARTER_CONFIG)?;

            println!("Created {}", path.display());
            println!();
            println!("You can now customize:");
            println!("  - [model] name, endpoint, api_key_env");
            println!("  - [orchestrator] plan, max_concurrency");
            println!("  - [verdict] caution_below, trust_above");
            println!("  - [[plans]] for custom agent plans");
            println!();
        }
    }

    Ok(())
}
