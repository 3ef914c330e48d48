//! Built-in role prompt templates.
//!
//! Placeholders are written `{name}`; see [`super::PLACEHOLDERS`] for the
//! full list. `{prior:<id>}` quotes the outcome of agent `<id>`, which must
//! be a declared dependency.

use crate::agent::AgentRole;

pub const FACT_AUDITOR: &str = "\
You are a meticulous fact auditor reviewing the website of {client_name}, \
an organisation in the {industry} sector.

Use ONLY the website content below. Do not rely on prior knowledge.

## Website
- URL: {url}
- Title: {title}
- Meta description: {meta_description}

## Content
{body_preview}

## Task
1. Extract each fact on this checklist. Use the exact key names inside `facts`. \
Write \"not found\" when the content does not state the fact.
{fact_checklist}
2. List concrete data-quality issues (missing, outdated or contradictory information) in `issues`.
3. Rate data integrity from 0 (unusable) to 100 (complete and consistent) as `integrity_score`.
4. Summarise in two sentences in `summary`.

{output_schema}";

pub const BRAND_PSYCHOLOGIST: &str = "\
You are a brand psychologist assessing how the website of {client_name} \
({industry}) is perceived by a first-time visitor.

The client's stated goals: {stated_goals}

## Website
- URL: {url}
- Title: {title}
- Meta description: {meta_description}

## Content
{body_preview}

## Task
Describe the perceived tone, list strengths and weaknesses of the messaging, \
and rate from 0 to 100 how well the presence serves the stated goals as `alignment_score`.

{output_schema}";

pub const NAIVE_MEMORY: &str = "\
Answer from memory only. You cannot browse and you are not shown the website.

What do you know about {client_name}, an organisation in the {industry} sector \
whose website is {url}?

Give your best recollection for each fact on this checklist, using the exact key \
names inside `facts`. Write \"unknown\" when you have no recollection.
{fact_checklist}

Rate your overall confidence from 0 to 100 as `confidence`.

{output_schema}";

pub const REPUTATION_ANALYST: &str = "\
You are a reputation analyst. Assess the public reputation of {client_name} \
({industry}) as reflected by its website {url}.

- Title: {title}
- Meta description: {meta_description}

## Content
{body_preview}

Rate the reputation from 0 to 100 as `reputation_score` and list concrete risks.

{output_schema}";

pub const SYNTHESIS_JUDGE: &str = "\
You are the final judge of a web presence audit for {client_name} ({industry}).

Earlier steps produced the answers below. Compare what was believed from memory \
with what was found on the website ({url}). List every discrepancy in \
`discrepancies`, rate overall data integrity from 0 to 100 as `integrity_score`, \
and give a one-paragraph plain-language `verdict`.

{prior_outcomes}

{output_schema}";

/// Stage two of the interrogation chain: check the memory answer against the site.
pub const FACT_CHECK_AGAINST_MEMORY: &str = "\
You are a meticulous fact auditor for {client_name} ({industry}).

An assistant answering from memory claimed the following:
{prior:memory}

Check every claim against the website content below. Use ONLY this content.

## Website
- URL: {url}
- Title: {title}
- Meta description: {meta_description}

## Content
{body_preview}

## Task
1. Record what the website actually states for each checklist fact inside `facts` \
(\"not found\" when absent).
{fact_checklist}
2. List each claim the website contradicts or does not support in `issues`.
3. Rate data integrity from 0 to 100 as `integrity_score`.
4. Summarise in two sentences in `summary`.

{output_schema}";

pub const CUSTOM: &str = "\
Audit the web presence of {client_name} ({industry}) at {url}.

Client goals: {stated_goals}

- Title: {title}
- Meta description: {meta_description}

## Content
{body_preview}

{output_schema}";

/// The default template for a role.
pub fn default_template(role: &AgentRole) -> &'static str {
    match role {
        AgentRole::FactAuditor => FACT_AUDITOR,
        AgentRole::BrandPsychologist => BRAND_PSYCHOLOGIST,
        AgentRole::NaiveMemory => NAIVE_MEMORY,
        AgentRole::ReputationAnalyst => REPUTATION_ANALYST,
        AgentRole::SynthesisJudge => SYNTHESIS_JUDGE,
        AgentRole::Custom(_) => CUSTOM,
    }
}
