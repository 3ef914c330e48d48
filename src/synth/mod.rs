//! Synthesis of per-agent outcomes into one `AuditReport`.
//!
//! The synthesizer extracts the integrity and brand-alignment scores, then
//! applies the verdict rule in [`verdict`] to their mean. A failed scoring
//! agent yields the "unavailable" sentinel, never a zero.

pub mod verdict;

pub use verdict::{
    DEFAULT_CAUTION_BELOW, DEFAULT_TRUST_ABOVE, Discrepancy, VerdictThresholds, VerdictTier,
    find_discrepancies,
};

use crate::agent::{AgentRole, DerivedScore, parse_score};
use crate::dag::OutcomeMap;
use crate::plans::AuditPlan;
use audit_common::{
    AgentOutcome, AuditReport, ClientBrief, ErrorKind, ReportMetadata, ReportScores, ScoreValue,
    ScrapedContent,
};
use serde_json::Value;
use tracing::{debug, warn};

/// How many discrepancies a verdict names before summarizing the rest.
const MAX_NAMED_DISCREPANCIES: usize = 3;

/// Merges outcomes into a report.
#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    thresholds: VerdictThresholds,
}

impl Synthesizer {
    pub fn new(thresholds: VerdictThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &VerdictThresholds {
        &self.thresholds
    }

    /// Build the report. Never fails.
    ///
    /// The report's agent map is shaped by the plan: a missing outcome is
    /// filled with a failure and outcomes for unknown ids are dropped.
    pub fn merge(
        &self,
        plan: &AuditPlan,
        mut outcomes: OutcomeMap,
        brief: &ClientBrief,
        content: &ScrapedContent,
    ) -> AuditReport {
        let per_agent: OutcomeMap = plan
            .agents()
            .iter()
            .map(|spec| {
                let outcome = outcomes.remove(&spec.id).unwrap_or_else(|| {
                    warn!(agent = %spec.id, "No outcome recorded for agent");
                    AgentOutcome::failure(ErrorKind::TransportError, "no outcome was recorded")
                });
                (spec.id.clone(), outcome)
            })
            .collect();

        let scores = ReportScores {
            integrity: extract_score(plan, &per_agent, DerivedScore::Integrity),
            brand_alignment: extract_score(plan, &per_agent, DerivedScore::BrandAlignment),
        };
        let derived_verdict = self.verdict(plan, &per_agent, &scores, content);
        debug!(?scores, has_verdict = derived_verdict.is_some(), "Synthesized report");

        AuditReport::new(
            per_agent,
            derived_verdict,
            ReportMetadata {
                client: brief.name().to_string(),
                url: content.url.clone(),
                site_content_available: content.is_available(),
                scores,
            },
        )
    }

    fn verdict(
        &self,
        plan: &AuditPlan,
        per_agent: &OutcomeMap,
        scores: &ReportScores,
        content: &ScrapedContent,
    ) -> Option<String> {
        let scorers: Vec<&str> = plan
            .agents()
            .iter()
            .filter(|a| a.role.derived_score().is_some())
            .map(|a| a.id.as_str())
            .collect();
        if scorers.is_empty() {
            return None;
        }

        let available: Vec<u8> = [scores.integrity, scores.brand_alignment]
            .iter()
            .filter_map(ScoreValue::as_score)
            .collect();

        let mut verdict = if available.is_empty() {
            format!(
                "Verdict unavailable: the scoring agents ({}) did not produce usable answers.",
                scorers.join(", ")
            )
        } else {
            let combined = combine(&available);
            let tier = self.thresholds.tier(combined);
            let mut text = format!("{} ({}/100): {}.", tier, combined, tier.headline());
            if tier == VerdictTier::Cautionary
                && let Some(named) = discrepancy_sentence(plan, per_agent)
            {
                text.push(' ');
                text.push_str(&named);
            }
            for (derived, label, score) in [
                (DerivedScore::Integrity, "Data integrity", scores.integrity),
                (DerivedScore::BrandAlignment, "Brand alignment", scores.brand_alignment),
            ] {
                if !score.is_available() && has_scorer(plan, derived) {
                    text.push_str(&format!(" {} score unavailable.", label));
                }
            }
            text
        };

        if !content.is_available() {
            verdict.push_str(" No site content was available; findings rest on the client brief alone.");
        }
        Some(verdict)
    }
}

/// Mean of the available scores, rounded half up.
fn combine(scores: &[u8]) -> u8 {
    let sum: u32 = scores.iter().map(|&s| u32::from(s)).sum();
    let n = scores.len() as u32;
    ((sum * 2 + n) / (n * 2)) as u8
}

fn has_scorer(plan: &AuditPlan, wanted: DerivedScore) -> bool {
    plan.agents()
        .iter()
        .any(|a| a.role.derived_score().map(|(d, _)| d) == Some(wanted))
}

/// Read a derived score. A judge's integrity score takes precedence over a
/// fact auditor's, since the judge has seen both sides.
fn extract_score(plan: &AuditPlan, per_agent: &OutcomeMap, wanted: DerivedScore) -> ScoreValue {
    let mut candidates: Vec<_> = plan
        .agents()
        .iter()
        .filter_map(|spec| match spec.role.derived_score() {
            Some((derived, field)) if derived == wanted => Some((spec, field)),
            _ => None,
        })
        .collect();
    candidates.sort_by_key(|(spec, _)| spec.role != AgentRole::SynthesisJudge);

    candidates
        .into_iter()
        .find_map(|(spec, field)| {
            per_agent
                .get(&spec.id)
                .and_then(AgentOutcome::payload)
                .and_then(|payload| payload.get(field))
                .and_then(parse_score)
        })
        .into()
}

/// Name what the memory probe believed against what the site states.
///
/// Uses a judge's own `discrepancies` list when present, otherwise compares
/// the memory and fact auditor `facts` objects key by key.
fn discrepancy_sentence(plan: &AuditPlan, per_agent: &OutcomeMap) -> Option<String> {
    let payload_of = |role: &AgentRole| {
        plan.agents()
            .iter()
            .filter(|a| &a.role == role)
            .find_map(|a| per_agent.get(&a.id).and_then(AgentOutcome::payload))
    };

    let mut named: Vec<String> = payload_of(&AgentRole::SynthesisJudge)
        .and_then(|p| p.get("discrepancies"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    Value::Object(_) => Some(v.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    if named.is_empty()
        && let (Some(memory), Some(facts)) = (
            payload_of(&AgentRole::NaiveMemory).and_then(|p| p.get("facts")),
            payload_of(&AgentRole::FactAuditor).and_then(|p| p.get("facts")),
        )
    {
        named = find_discrepancies(memory, facts)
            .iter()
            .map(ToString::to_string)
            .collect();
    }

    if named.is_empty() {
        return None;
    }

    let total = named.len();
    named.truncate(MAX_NAMED_DISCREPANCIES);
    let mut sentence = format!("Memory and site disagree on {}", named.join("; "));
    if total > MAX_NAMED_DISCREPANCIES {
        sentence.push_str(&format!(" (and {} more)", total - MAX_NAMED_DISCREPANCIES));
    }
    sentence.push('.');
    Some(sentence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plans;
    use serde_json::json;

    fn brief() -> ClientBrief {
        ClientBrief::new("Acme Academy", "education", "more enrolments").unwrap()
    }

    fn content() -> ScrapedContent {
        ScrapedContent::new("https://acme.test", "Acme", "", "Welcome", 100)
    }

    fn ok(payload: Value) -> AgentOutcome {
        AgentOutcome::success(payload)
    }

    fn parallel_outcomes(integrity: u8, alignment: u8) -> OutcomeMap {
        let mut map = OutcomeMap::new();
        map.insert(
            "facts".to_string(),
            ok(json!({"facts": {}, "integrity_score": integrity, "issues": [], "summary": "s"})),
        );
        map.insert(
            "brand".to_string(),
            ok(json!({"alignment_score": alignment, "perceived_tone": "warm", "strengths": [], "weaknesses": [], "summary": "s"})),
        );
        map
    }

    #[test]
    fn test_scores_and_tier() {
        let plan = plans::builtin("parallel").unwrap();
        let report = Synthesizer::default().merge(&plan, parallel_outcomes(90, 80), &brief(), &content());

        assert_eq!(report.scores().integrity, ScoreValue::Score(90));
        assert_eq!(report.scores().brand_alignment, ScoreValue::Score(80));
        assert!(report.derived_verdict().unwrap().starts_with("Trustworthy (85/100)"));
        assert_eq!(report.metadata().client, "Acme Academy");
        assert!(report.metadata().site_content_available);
    }

    #[test]
    fn test_every_combined_score_gets_one_tier() {
        let plan = plans::builtin("parallel").unwrap();
        let synth = Synthesizer::default();
        for score in 0..=100u8 {
            let report = synth.merge(&plan, parallel_outcomes(score, score), &brief(), &content());
            let verdict = report.derived_verdict().unwrap();
            let tiers = ["Cautionary", "Mixed", "Trustworthy"]
                .iter()
                .filter(|t| verdict.starts_with(*t))
                .count();
            assert_eq!(tiers, 1, "score {score}: {verdict}");
            let expected = synth.thresholds().tier(score).to_string();
            assert!(verdict.starts_with(&expected));
        }
    }

    #[test]
    fn test_failed_scorer_is_unavailable_not_zero() {
        let plan = plans::builtin("parallel").unwrap();
        let mut outcomes = parallel_outcomes(70, 60);
        outcomes.insert(
            "brand".to_string(),
            AgentOutcome::failure(ErrorKind::UpstreamRefusal, "declined"),
        );

        let report = Synthesizer::default().merge(&plan, outcomes, &brief(), &content());

        assert_eq!(report.scores().brand_alignment, ScoreValue::Unavailable);
        let verdict = report.derived_verdict().unwrap();
        assert!(verdict.starts_with("Mixed (70/100)"));
        assert!(verdict.contains("Brand alignment score unavailable"));
    }

    #[test]
    fn test_all_scorers_failed() {
        let plan = plans::builtin("parallel").unwrap();
        let report = Synthesizer::default().merge(&plan, OutcomeMap::new(), &brief(), &content());

        assert_eq!(report.per_agent().len(), 2);
        assert_eq!(report.failed_count(), 2);
        assert!(report.derived_verdict().unwrap().starts_with("Verdict unavailable"));
    }

    #[test]
    fn test_no_scoring_agent_means_no_verdict() {
        let plan = plans::builtin("reputation").unwrap();
        let mut outcomes = OutcomeMap::new();
        outcomes.insert(
            "reputation".to_string(),
            ok(json!({"reputation_score": 40, "risks": [], "summary": "s"})),
        );
        let report = Synthesizer::default().merge(&plan, outcomes, &brief(), &content());
        assert!(report.derived_verdict().is_none());
    }

    #[test]
    fn test_cautionary_verdict_names_discrepancy() {
        let plan = plans::builtin("full").unwrap();
        let mut outcomes = parallel_outcomes(30, 40);
        outcomes.insert(
            "memory".to_string(),
            ok(json!({"facts": {"director": "Jane Doe"}, "confidence": 70, "summary": "s"})),
        );
        outcomes.insert(
            "facts".to_string(),
            ok(json!({"facts": {"director": "John Roe"}, "integrity_score": 30, "issues": [], "summary": "s"})),
        );

        let report = Synthesizer::default().merge(&plan, outcomes, &brief(), &content());
        let verdict = report.derived_verdict().unwrap();

        assert!(verdict.starts_with("Cautionary (35/100)"));
        assert!(verdict.contains("director: believed \"Jane Doe\" but the site says \"John Roe\""));
    }

    #[test]
    fn test_judge_score_and_discrepancies_take_precedence() {
        let plan = plans::builtin("interrogation").unwrap();
        let mut outcomes = OutcomeMap::new();
        outcomes.insert(
            "memory".to_string(),
            ok(json!({"facts": {}, "confidence": 10, "summary": "s"})),
        );
        outcomes.insert(
            "fact_check".to_string(),
            ok(json!({"facts": {}, "integrity_score": 90, "issues": [], "summary": "s"})),
        );
        outcomes.insert(
            "judge".to_string(),
            ok(json!({"integrity_score": 20, "discrepancies": ["open day date differs"], "verdict": "v"})),
        );

        let report = Synthesizer::default().merge(&plan, outcomes, &brief(), &content());

        assert_eq!(report.scores().integrity, ScoreValue::Score(20));
        let verdict = report.derived_verdict().unwrap();
        assert!(verdict.contains("Memory and site disagree on open day date differs."));
    }

    #[test]
    fn test_unknown_outcomes_dropped_and_degraded_content_noted() {
        let plan = plans::builtin("parallel").unwrap();
        let mut outcomes = parallel_outcomes(60, 60);
        outcomes.insert("stray".to_string(), ok(json!({})));
        let degraded = ScrapedContent::unavailable("https://acme.test", "timed out");

        let report = Synthesizer::default().merge(&plan, outcomes, &brief(), &degraded);

        assert!(report.outcome("stray").is_none());
        assert!(!report.metadata().site_content_available);
        assert!(report.derived_verdict().unwrap().contains("No site content was available"));
    }

    #[test]
    fn test_combine_rounds_half_up() {
        assert_eq!(combine(&[49, 50]), 50);
        assert_eq!(combine(&[80, 81]), 81);
        assert_eq!(combine(&[100]), 100);
    }
}
