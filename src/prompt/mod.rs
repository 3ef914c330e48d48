//! Prompt construction.
//!
//! [`PromptBuilder::build`] is a pure function of the agent spec, the client
//! brief, the scraped content and the outcomes recorded so far. Identical
//! inputs always produce identical prompt text.
//!
//! ## Placeholders
//!
//! | Placeholder          | Rendered from                                  |
//! |----------------------|------------------------------------------------|
//! | `{client_name}`      | `ClientBrief::name`                            |
//! | `{industry}`         | `ClientBrief::industry`                        |
//! | `{stated_goals}`     | `ClientBrief::stated_goals`                    |
//! | `{url}`              | `ScrapedContent::url`                          |
//! | `{title}`            | `ScrapedContent::title`                        |
//! | `{meta_description}` | `ScrapedContent::meta_description`             |
//! | `{body_preview}`     | `ScrapedContent::body_preview`                 |
//! | `{fact_checklist}`   | the shared fact checklist                      |
//! | `{output_schema}`    | response shape instructions                    |
//! | `{prior_outcomes}`   | every dependency's outcome, in declared order  |
//! | `{prior:<id>}`       | the outcome of dependency `<id>`               |
//!
//! Empty fields render as `unspecified`, never as a blank.

pub mod templates;

use crate::agent::{AgentSpec, FACT_CHECKLIST, OutputSchema};
use crate::dag::OutcomeMap;
use audit_common::{AgentOutcome, ClientBrief, ScrapedContent};
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Placeholder names a template may use (besides `{prior:<id>}`).
pub const PLACEHOLDERS: &[&str] = &[
    "client_name",
    "industry",
    "stated_goals",
    "url",
    "title",
    "meta_description",
    "body_preview",
    "fact_checklist",
    "output_schema",
    "prior_outcomes",
];

/// Rendered in place of an empty field.
pub const UNSPECIFIED: &str = "unspecified";

/// Rendered in place of site content for roles that must not see it.
pub const WITHHELD: &str = "[withheld]";

/// Rendered as the body when the site could not be fetched.
pub const NO_SITE_CONTENT: &str = "[no site content available: the website could not be fetched]";

/// Marker quoted to dependents when an upstream agent failed.
pub const UPSTREAM_FAILED_MARKER: &str = "UPSTREAM STEP FAILED";

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([a-z_]+)(?::([A-Za-z0-9_.\-]+))?\}").expect("placeholder regex is valid")
});

/// A placeholder occurrence found in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    /// `{name}`, a brief/content/section placeholder.
    Field(String),
    /// `{prior:<id>}`.
    Prior(String),
}

/// List the placeholders a template uses, in order of appearance.
pub fn placeholders_in(template: &str) -> Vec<Placeholder> {
    PLACEHOLDER_RE
        .captures_iter(template)
        .map(|caps| match (caps.get(1), caps.get(2)) {
            (Some(name), Some(id)) if name.as_str() == "prior" => {
                Placeholder::Prior(id.as_str().to_string())
            }
            (Some(name), Some(id)) => Placeholder::Field(format!("{}:{}", name.as_str(), id.as_str())),
            (Some(name), None) => Placeholder::Field(name.as_str().to_string()),
            _ => Placeholder::Field(String::new()),
        })
        .collect()
}

/// A fully rendered prompt with the schema its answer must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub schema: OutputSchema,
}

/// Stateless prompt renderer.
pub struct PromptBuilder;

impl PromptBuilder {
    /// Render the prompt for `spec`.
    ///
    /// Dependencies' outcomes are quoted into the text: through
    /// `{prior:<id>}` / `{prior_outcomes}` when the template places them,
    /// otherwise in an appended section. A failed dependency is quoted as an
    /// explicit [`UPSTREAM_FAILED_MARKER`] line, never as the raw error.
    pub fn build(
        spec: &AgentSpec,
        brief: &ClientBrief,
        content: &ScrapedContent,
        prior: &OutcomeMap,
    ) -> Prompt {
        let sees_site = spec.role.sees_site_content();
        let site_field = |value: &str| -> String {
            if !sees_site {
                WITHHELD.to_string()
            } else {
                or_unspecified(value)
            }
        };

        let body = if !sees_site {
            WITHHELD.to_string()
        } else if !content.is_available() {
            NO_SITE_CONTENT.to_string()
        } else {
            or_unspecified(&content.body_preview)
        };

        let schema_section = schema_section(&spec.output_schema);
        let prior_section = prior_section(spec, prior);

        let mut quoted_prior = false;
        let mut placed_schema = false;

        let rendered = PLACEHOLDER_RE.replace_all(&spec.prompt_template, |caps: &Captures| {
            let name = caps.get(1).map_or("", |m| m.as_str());
            if let Some(id) = caps.get(2) {
                if name == "prior" {
                    quoted_prior = true;
                    return render_prior(id.as_str(), prior);
                }
                return caps[0].to_string();
            }
            match name {
                "client_name" => brief.name().to_string(),
                "industry" => or_unspecified(brief.industry()),
                "stated_goals" => or_unspecified(brief.stated_goals()),
                "url" => or_unspecified(&content.url),
                "title" => site_field(&content.title),
                "meta_description" => site_field(&content.meta_description),
                "body_preview" => body.clone(),
                "fact_checklist" => fact_checklist(),
                "output_schema" => {
                    placed_schema = true;
                    schema_section.clone()
                }
                "prior_outcomes" => {
                    quoted_prior = true;
                    prior_section.clone()
                }
                // Unknown names are rejected when the plan is built; leave
                // anything else (e.g. literal braces) untouched.
                _ => caps[0].to_string(),
            }
        });

        let mut text = rendered.trim_end().to_string();
        if spec.has_dependencies() && !quoted_prior {
            text.push_str("\n\n");
            text.push_str(&prior_section);
        }
        if !placed_schema {
            text.push_str("\n\n");
            text.push_str(&schema_section);
        }

        Prompt {
            text,
            schema: spec.output_schema.clone(),
        }
    }
}

fn or_unspecified(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        UNSPECIFIED.to_string()
    } else {
        trimmed.to_string()
    }
}

fn fact_checklist() -> String {
    FACT_CHECKLIST
        .iter()
        .map(|(key, description)| format!("   - `{}`: {}", key, description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn schema_section(schema: &OutputSchema) -> String {
    format!(
        "Respond ONLY with a single JSON object matching this shape, with no other text:\n{}",
        schema.hint()
    )
}

fn prior_section(spec: &AgentSpec, prior: &OutcomeMap) -> String {
    let mut section = String::from("## Answers from earlier steps");
    for id in &spec.depends_on {
        section.push_str(&format!("\n\n### {}\n{}", id, render_prior(id, prior)));
    }
    section
}

/// String form of one upstream outcome.
fn render_prior(id: &str, prior: &OutcomeMap) -> String {
    match prior.get(id) {
        Some(AgentOutcome::Success { payload }) => payload.to_string(),
        Some(AgentOutcome::Failure { error }) => format!(
            "[{}: step '{}' produced no usable answer ({})]",
            UPSTREAM_FAILED_MARKER,
            id,
            error.kind.label()
        ),
        None => format!("[{}: step '{}' has no recorded outcome]", UPSTREAM_FAILED_MARKER, id),
    }
}
