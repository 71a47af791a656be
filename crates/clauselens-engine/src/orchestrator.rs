//! Domain selection, concurrent fan-out, and fan-in aggregation.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info};

use clauselens_ai::{EmbeddingIndex, Topic, mentioned_topics};
use clauselens_core::config::EngineConfig;
use clauselens_core::model::{AgentResult, Domain, EvidenceItem, ExecutiveAnalysis, RiskLevel};
use clauselens_core::text::{contains_any, contains_term};

use crate::error::PipelineError;
use crate::scoring::{DomainOutcome, evaluate_domain};

const MAX_SUMMARY_POINTS: usize = 3;

/// Summary point used when no selected domain produced a grade.
pub(crate) const NO_RISK_CLAUSES_POINT: &str =
    "No relevant risk-bearing clauses were identified in the provided text for the reviewed categories.";

/// Phrases that ask for a whole-contract review.
const BROAD_REVIEW_MARKERS: &[&str] = &[
    "overall",
    "full",
    "entire",
    "whole",
    "end-to-end",
    "all clauses",
    "all risks",
    "key risks",
    "general risks",
    "review the contract",
    "review this agreement",
    "comprehensive",
    "complete analysis",
];

/// Domain names a "review ..." instruction may list.
const EXPLICIT_DOMAIN_NAMES: &[(Domain, &[&str])] = &[
    (Domain::Legal, &["legal"]),
    (Domain::Compliance, &["compliance"]),
    (Domain::Finance, &["finance"]),
    (Domain::Operations, &["operations", "ops"]),
];

/// Topics that route a question to each domain.
const TOPIC_ROUTES: &[(Domain, &[Topic])] = &[
    (Domain::Legal, &[Topic::Termination, Topic::Liability]),
    (Domain::Compliance, &[Topic::Privacy, Topic::Audit]),
    (Domain::Finance, &[Topic::Payment, Topic::LateFees]),
    (Domain::Operations, &[Topic::Availability, Topic::Sla]),
];

const COMPLIANCE_KEYWORDS: &[&str] = &[
    "gdpr",
    "hipaa",
    "privacy",
    "data protection",
    "security",
    "breach",
    "incident",
    "retention",
    "subprocessor",
    "audit",
];

const OPERATIONS_KEYWORDS: &[&str] = &[
    "sla",
    "uptime",
    "availability",
    "service availability",
    "service credits",
    "support",
];

/// Domains to evaluate for `question`, in report order.
///
/// Broad review wording (or `run_all`) selects every domain. An explicit
/// "review legal, finance ..." instruction selects exactly the named domains.
/// Otherwise domains are routed by requested topics and a keyword fallback for
/// compliance and operations; a question that routes nowhere selects all.
pub fn select_domains(question: &str, run_all: bool) -> Vec<Domain> {
    let q = question.to_lowercase();
    if run_all || contains_any(&q, BROAD_REVIEW_MARKERS) {
        return Domain::ALL.to_vec();
    }

    if contains_term(&q, "review") {
        let explicit: Vec<Domain> = EXPLICIT_DOMAIN_NAMES
            .iter()
            .filter(|(_, names)| contains_any(&q, names))
            .map(|(d, _)| *d)
            .collect();
        if !explicit.is_empty() {
            return explicit;
        }
    }

    let topics = mentioned_topics(question);
    let mut selected: Vec<Domain> = TOPIC_ROUTES
        .iter()
        .filter(|(_, routed)| routed.iter().any(|t| topics.contains(t)))
        .map(|(d, _)| *d)
        .collect();
    if contains_any(&q, COMPLIANCE_KEYWORDS) && !selected.contains(&Domain::Compliance) {
        selected.push(Domain::Compliance);
    }
    if contains_any(&q, OPERATIONS_KEYWORDS) && !selected.contains(&Domain::Operations) {
        selected.push(Domain::Operations);
    }

    if selected.is_empty() {
        return Domain::ALL.to_vec();
    }
    selected.sort();
    selected
}

/// Evaluate `domains` concurrently on the blocking pool over a shared index.
///
/// Every task is awaited before returning. A task that panicked fails the whole
/// run; partial results are never returned.
pub async fn run_domains(
    index: Arc<EmbeddingIndex>,
    config: Arc<EngineConfig>,
    domains: &[Domain],
) -> Result<Vec<(Domain, DomainOutcome)>, PipelineError> {
    let tasks = domains.iter().map(|&domain| {
        let index = Arc::clone(&index);
        let config = Arc::clone(&config);
        let handle = tokio::task::spawn_blocking(move || evaluate_domain(domain, &index, &config));
        async move { (domain, handle.await) }
    });

    let mut outcomes = Vec::with_capacity(domains.len());
    for (domain, joined) in join_all(tasks).await {
        let outcome = joined.map_err(|e| PipelineError::DomainTask {
            domain: domain.to_string(),
            reason: e.to_string(),
        })?;
        debug!(domain = %domain, level = %outcome.result.risk_level, "domain finished");
        outcomes.push((domain, outcome));
    }
    info!(domains = outcomes.len(), "domain fan-out complete");
    Ok(outcomes)
}

/// Assemble the executive analysis from finished domain outcomes.
///
/// Domains not in `outcomes` are recorded as skipped. Overall risk is the worst
/// graded domain; summary points are ordered worst first, then shortest.
pub fn aggregate(outcomes: Vec<(Domain, DomainOutcome)>) -> ExecutiveAnalysis {
    let mut results: Vec<(Domain, AgentResult)> = Vec::new();
    let mut points: Vec<(u8, String)> = Vec::new();
    let mut evidence_by_domain: Vec<(Domain, Vec<EvidenceItem>)> = Vec::new();

    for (domain, outcome) in outcomes {
        if let Some(point) = outcome.summary_point {
            points.push(point);
        }
        evidence_by_domain.push((domain, outcome.evidence));
        results.push((domain, outcome.result));
    }

    let result_for = |d: Domain| {
        results
            .iter()
            .find(|(domain, _)| *domain == d)
            .map(|(_, r)| r.clone())
            .unwrap_or_else(|| AgentResult::skipped(d))
    };

    let mut overall_risk = RiskLevel::max_of(results.iter().map(|(_, r)| r.risk_level));

    points.sort_by(|(ra, a), (rb, b)| rb.cmp(ra).then(a.len().cmp(&b.len())));
    let mut executive_summary_points: Vec<String> = points
        .into_iter()
        .take(MAX_SUMMARY_POINTS)
        .map(|(_, p)| p)
        .collect();
    if executive_summary_points.is_empty() {
        executive_summary_points.push(NO_RISK_CLAUSES_POINT.to_string());
        overall_risk = RiskLevel::Unknown;
    }

    // Key evidence leads with the commercial terms.
    let mut key_evidence = Vec::new();
    for d in [Domain::Finance, Domain::Legal, Domain::Operations, Domain::Compliance] {
        if let Some((_, items)) = evidence_by_domain.iter().find(|(domain, _)| *domain == d) {
            key_evidence.extend(items.iter().cloned());
        }
    }

    ExecutiveAnalysis {
        legal: result_for(Domain::Legal),
        compliance: result_for(Domain::Compliance),
        finance: result_for(Domain::Finance),
        operations: result_for(Domain::Operations),
        overall_risk,
        executive_summary_points,
        key_evidence,
    }
}
