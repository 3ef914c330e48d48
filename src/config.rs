//! Layered configuration for the auditor.
//!
//! Settings are read from `site-audit.toml`, then overridden by environment
//! variables, then by CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [model]
//! name = "gemini-2.5-flash"
//! endpoint = "https://generativelanguage.googleapis.com/v1beta"
//! api_key_env = "GEMINI_API_KEY"
//! timeout_secs = 60
//!
//! [fetch]
//! timeout_secs = 30
//! preview_chars = 5000
//!
//! [orchestrator]
//! plan = "full"
//! max_concurrency = 0
//!
//! [verdict]
//! caution_below = 50
//! trust_above = 80
//!
//! [[plans]]
//! name = "seo"
//! description = "SEO review, then a judge"
//!
//! [[plans.agents]]
//! id = "seo"
//! role = "custom:SEO Reviewer"
//! template = "Review {url} for {client_name}.\n{output_schema}"
//!
//! [[plans.agents]]
//! id = "judge"
//! role = "judge"
//! depends_on = ["seo"]
//! ```

use crate::errors::{ConfigError, PlanError};
use crate::plans::{self, AuditPlan, BUILTIN_PLANS, DEFAULT_PLAN, PlanDef};
use crate::synth::VerdictThresholds;
use audit_common::DEFAULT_PREVIEW_CHARS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "site-audit.toml";

pub const ENV_MODEL: &str = "SITE_AUDIT_MODEL";
pub const ENV_ENDPOINT: &str = "SITE_AUDIT_ENDPOINT";
pub const ENV_MAX_CONCURRENCY: &str = "SITE_AUDIT_MAX_CONCURRENCY";
pub const ENV_PLAN: &str = "SITE_AUDIT_PLAN";

/// Model transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    /// Model name, e.g. "gemini-2.5-flash"
    pub name: String,
    /// Base URL of the generateContent API
    pub endpoint: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub temperature: f32,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            name: "gemini-2.5-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 60,
            temperature: 0.2,
        }
    }
}

/// Page fetch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    pub timeout_secs: u64,
    /// Character cap of the body preview shown to agents
    pub preview_chars: usize,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            timeout_secs: crate::fetch::DEFAULT_FETCH_TIMEOUT_SECS,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }
}

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSection {
    /// Plan to run when none is given on the command line
    pub plan: String,
    /// Cap on in-flight invocations per wave (0 = whole wave)
    pub max_concurrency: usize,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            plan: DEFAULT_PLAN.to_string(),
            max_concurrency: 0,
        }
    }
}

/// The `site-audit.toml` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditToml {
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub fetch: FetchSection,
    #[serde(default)]
    pub orchestrator: OrchestratorSection,
    #[serde(default)]
    pub verdict: VerdictThresholds,
    /// Custom plans
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plans: Vec<PlanDef>,
}

impl AuditToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(format!("failed to serialize configuration: {}", e)))?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides, looking variables up with `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup(ENV_MODEL).filter(|v| !v.trim().is_empty()) {
            self.model.name = model.trim().to_string();
        }
        if let Some(endpoint) = lookup(ENV_ENDPOINT).filter(|v| !v.trim().is_empty()) {
            self.model.endpoint = endpoint.trim().to_string();
        }
        if let Some(plan) = lookup(ENV_PLAN).filter(|v| !v.trim().is_empty()) {
            self.orchestrator.plan = plan.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_MAX_CONCURRENCY).filter(|v| !v.trim().is_empty()) {
            self.orchestrator.max_concurrency = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!(
                    "{} must be a non-negative integer, got '{}'",
                    ENV_MAX_CONCURRENCY, raw
                ))
            })?;
        }
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.fetch.preview_chars == 0 {
            warnings.push("fetch.preview_chars is 0: agents will see no page text".to_string());
        }
        if self.fetch.timeout_secs == 0 {
            warnings.push("fetch.timeout_secs is 0: every fetch will time out".to_string());
        }
        if self.model.timeout_secs == 0 {
            warnings.push("model.timeout_secs is 0: every model call will time out".to_string());
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            warnings.push(format!(
                "model.temperature {} is outside the usual 0.0-2.0 range",
                self.model.temperature
            ));
        }
        if self.model.api_key_env.trim().is_empty() {
            warnings.push("model.api_key_env is empty: no API key can be read".to_string());
        }
        for def in &self.plans {
            if BUILTIN_PLANS.contains(&def.name.as_str()) {
                warnings.push(format!(
                    "Custom plan '{}' shadows the built-in plan of the same name",
                    def.name
                ));
            }
        }

        warnings
    }

    /// Hard errors: a non-total verdict rule, or an invalid custom plan.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.verdict.validate().map_err(ConfigError::Invalid)?;
        for def in &self.plans {
            def.to_plan()?;
        }
        Ok(())
    }
}

/// CLI flags that override file and environment settings.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub plan: Option<String>,
    pub model: Option<String>,
    pub max_concurrency: Option<usize>,
}

/// Resolved configuration (file → environment → CLI).
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// File the settings came from, if one was found
    pub source: Option<PathBuf>,
    pub toml: AuditToml,
}

impl AuditConfig {
    /// Load from `path`, or from `site-audit.toml` in the working directory.
    ///
    /// An explicitly given path must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (toml, source) = match path {
            Some(path) => (AuditToml::load(path)?, Some(path.to_path_buf())),
            None => {
                let default = PathBuf::from(CONFIG_FILE);
                if default.exists() {
                    (AuditToml::load(&default)?, Some(default))
                } else {
                    (AuditToml::default(), None)
                }
            }
        };

        let mut config = Self { source, toml };
        config.toml.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply CLI overrides.
    pub fn with_cli(mut self, overrides: CliOverrides) -> Self {
        if let Some(plan) = overrides.plan {
            self.toml.orchestrator.plan = plan;
        }
        if let Some(model) = overrides.model {
            self.toml.model.name = model;
        }
        if let Some(max) = overrides.max_concurrency {
            self.toml.orchestrator.max_concurrency = max;
        }
        self
    }

    /// The selected plan, built and validated.
    pub fn plan(&self) -> Result<AuditPlan, PlanError> {
        plans::resolve(&self.toml.orchestrator.plan, &self.toml.plans)
    }

    /// Read the model API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.toml.model.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.toml.fetch.timeout_secs)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.toml.model.timeout_secs)
    }

    /// Validate configuration and return warnings.
    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}

/// Commented starter file written by `site-audit config init`.
pub const STARTER_CONFIG: &str = r#"# site-audit configuration

[model]
name = "gemini-2.5-flash"
endpoint = "https://generativelanguage.googleapis.com/v1beta"
# The API key is read from this environment variable, never from this file.
api_key_env = "GEMINI_API_KEY"
timeout_secs = 60
temperature = 0.2

[fetch]
timeout_secs = 30
preview_chars = 5000

[orchestrator]
# One of: reputation, parallel, interrogation, full, or a custom plan below.
plan = "full"
# Cap on concurrent model calls within a wave; 0 runs the whole wave at once.
max_concurrency = 0

[verdict]
# score < caution_below => Cautionary; score > trust_above => Trustworthy.
caution_below = 50
trust_above = 80

# Custom plans:
#
# [[plans]]
# name = "seo"
# description = "SEO review, then a judge"
#
# [[plans.agents]]
# id = "seo"
# role = "custom:SEO Reviewer"
# template = "Review {url} for {client_name}.\n{output_schema}"
#
# [[plans.agents]]
# id = "judge"
# role = "judge"
# depends_on = ["seo"]
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let toml = AuditToml::default();
        assert_eq!(toml.orchestrator.plan, "full");
        assert_eq!(toml.fetch.preview_chars, 5000);
        assert_eq!(toml.verdict, VerdictThresholds::default());
        assert!(toml.validate().is_empty());
        assert!(toml.check().is_ok());
    }

    #[test]
    fn test_starter_config_parses_to_defaults() {
        let parsed = AuditToml::parse(STARTER_CONFIG).unwrap();
        assert_eq!(parsed, AuditToml::default());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let toml = AuditToml::parse(
            r#"
[verdict]
caution_below = 40

[orchestrator]
plan = "parallel"
"#,
        )
        .unwrap();

        assert_eq!(toml.verdict.caution_below, 40);
        assert_eq!(toml.verdict.trust_above, 80);
        assert_eq!(toml.orchestrator.plan, "parallel");
        assert_eq!(toml.model.api_key_env, "GEMINI_API_KEY");
    }

    #[test]
    fn test_env_overrides_file() {
        let mut toml = AuditToml::parse("[model]\nname = \"file-model\"\n").unwrap();
        toml.apply_env_with(env(&[
            (ENV_MODEL, "env-model"),
            (ENV_MAX_CONCURRENCY, "2"),
            (ENV_PLAN, "interrogation"),
        ]))
        .unwrap();

        assert_eq!(toml.model.name, "env-model");
        assert_eq!(toml.orchestrator.max_concurrency, 2);
        assert_eq!(toml.orchestrator.plan, "interrogation");
    }

    #[test]
    fn test_invalid_env_concurrency_is_an_error() {
        let mut toml = AuditToml::default();
        let err = toml
            .apply_env_with(env(&[(ENV_MAX_CONCURRENCY, "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_CONCURRENCY));
    }

    #[test]
    fn test_cli_overrides_env() {
        let config = AuditConfig {
            source: None,
            toml: AuditToml::default(),
        }
        .with_cli(CliOverrides {
            plan: Some("reputation".to_string()),
            model: None,
            max_concurrency: Some(1),
        });

        assert_eq!(config.plan().unwrap().name(), "reputation");
        assert_eq!(config.toml.orchestrator.max_concurrency, 1);
    }

    #[test]
    fn test_non_total_verdict_rule_rejected() {
        let toml = AuditToml::parse("[verdict]\ncaution_below = 90\ntrust_above = 10\n").unwrap();
        assert!(matches!(toml.check(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_custom_plan_errors_surface_at_check() {
        let toml = AuditToml::parse(
            r#"
[[plans]]
name = "broken"

[[plans.agents]]
id = "a"
role = "facts"
depends_on = ["missing"]
"#,
        )
        .unwrap();

        assert!(matches!(
            toml.check(),
            Err(ConfigError::Plan(PlanError::UnknownDependency { .. }))
        ));
    }

    #[test]
    fn test_shadowing_builtin_warns() {
        let toml = AuditToml::parse(
            r#"
[[plans]]
name = "parallel"

[[plans.agents]]
id = "only"
role = "brand"
"#,
        )
        .unwrap();

        let warnings = toml.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("shadows"));
    }

    #[test]
    fn test_save_and_load_round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let mut toml = AuditToml::default();
        toml.orchestrator.plan = "interrogation".to_string();
        toml.save(&path).unwrap();

        let loaded = AuditToml::load(&path).unwrap();
        assert_eq!(loaded.orchestrator.plan, "interrogation");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = AuditToml::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[model\nname = 1").unwrap();

        let err = AuditToml::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(CONFIG_FILE));
    }
}
