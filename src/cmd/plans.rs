//! List plans: `site-audit plans`.

use anyhow::Result;
use console::style;
use site_audit::config::AuditConfig;
use site_audit::plans;

use super::super::Cli;

pub fn cmd_plans(cli: &Cli) -> Result<()> {
    let config = AuditConfig::load(cli.config.as_deref())?;
    let custom = &config.toml.plans;

    println!();
    println!("Available plans");
    println!("===============");

    for name in plans::available(custom) {
        println!();
        let marker = if name == config.toml.orchestrator.plan {
            " (selected)"
        } else {
            ""
        };
        match plans::resolve(&name, custom) {
            Ok(plan) => {
                println!("{}{}", style(plan.name()).bold(), style(marker).green());
                if !plan.description().is_empty() {
                    println!("  {}", plan.description());
                }
                for (i, wave) in plan.waves().iter().enumerate() {
                    println!("  wave {}: {}", i, wave.join(", "));
                }
            }
            Err(e) => {
                println!("{}{}", style(&name).red().bold(), marker);
                println!("  invalid: {}", e);
            }
        }
    }
    println!();

    Ok(())
}
