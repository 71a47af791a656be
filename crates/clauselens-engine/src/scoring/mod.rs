//! Deterministic, clause-grounded domain risk scoring.
//!
//! Each domain reads only the statements accepted under its own topics. A
//! domain with no statements is `n/a`; otherwise each sub-signal is graded from
//! literal values in the clause text and the worst one wins. Findings quote the
//! values they are based on and never introduce a number the clause lacks.

pub mod compliance;
pub mod finance;
pub mod legal;
pub mod operations;

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use clauselens_ai::{EmbeddingIndex, Topic, extract_topic_statements};
use clauselens_core::config::{EngineConfig, RiskThresholds};
use clauselens_core::model::{AgentResult, Domain, EvidenceItem, RiskLevel};

static DAYS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\(?\b(\d{1,3})\)?[\s-]*(?:calendar\s+|business\s+)?days?\b")
        .expect("static regex")
});

static NET_DAYS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bnet\s+(\d{1,3})\b").expect("static regex"));

/// First day count stated in `clause` ("15 days", "thirty (30) days", "net 45").
pub(crate) fn first_day_count(clause: &str) -> Option<u32> {
    DAYS.captures(clause)
        .or_else(|| NET_DAYS.captures(clause))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Every day count in `clause` with the byte span of its phrase.
pub(crate) fn day_counts(clause: &str) -> Vec<(Range<usize>, u32)> {
    DAYS.captures_iter(clause)
        .filter_map(|c| {
            let phrase = c.get(0)?;
            let days = c.get(1)?.as_str().parse().ok()?;
            Some((phrase.range(), days))
        })
        .collect()
}

/// Grade every statement of `topic` and keep the worst. Ties keep document
/// order.
pub(crate) fn worst_statement<'a, T>(
    clauses: &'a TopicClauses,
    topic: Topic,
    grade: impl Fn(&str) -> (RiskLevel, T),
) -> Option<(&'a str, RiskLevel, T)> {
    clauses
        .get(topic)
        .iter()
        .map(|clause| {
            let (level, signal) = grade(clause);
            (clause.as_str(), level, signal)
        })
        .reduce(|worst, next| if next.1.rank() > worst.1.rank() { next } else { worst })
}

/// Join phrases as "a", "a and b", "a, b and c".
pub(crate) fn join_phrases(parts: &[&str]) -> String {
    match parts {
        [] => String::new(),
        [one] => (*one).to_string(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

/// Statements accepted per topic for one domain.
#[derive(Debug, Clone, Default)]
pub struct TopicClauses {
    by_topic: BTreeMap<Topic, Vec<String>>,
}

impl TopicClauses {
    pub fn insert(&mut self, topic: Topic, statements: Vec<String>) {
        self.by_topic.insert(topic, statements);
    }

    pub fn get(&self, topic: Topic) -> &[String] {
        self.by_topic.get(&topic).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.by_topic.values().all(Vec::is_empty)
    }
}

impl<const N: usize> From<[(Topic, Vec<String>); N]> for TopicClauses {
    fn from(entries: [(Topic, Vec<String>); N]) -> Self {
        Self {
            by_topic: entries.into_iter().collect(),
        }
    }
}

/// A domain's grade, findings and supporting clauses.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub level: RiskLevel,
    pub findings: Vec<String>,
    pub evidence: Vec<EvidenceItem>,
    /// What the grade rests on, for the executive summary ("the payment timing").
    pub basis: Vec<&'static str>,
}

impl Assessment {
    pub(crate) fn no_clause(finding: &str) -> Self {
        Self {
            level: RiskLevel::NotApplicable,
            findings: vec![finding.to_string()],
            evidence: Vec::new(),
            basis: Vec::new(),
        }
    }

    pub(crate) fn evidence(label: &str, text: &str) -> EvidenceItem {
        EvidenceItem {
            label: label.to_string(),
            text: text.to_string(),
        }
    }
}

/// Topics each domain reads, in evidence order.
pub fn domain_topics(domain: Domain) -> &'static [Topic] {
    match domain {
        Domain::Legal => &[Topic::Termination, Topic::Liability],
        Domain::Compliance => &[Topic::Compliance],
        Domain::Finance => &[Topic::Payment, Topic::LateFees],
        Domain::Operations => &[Topic::Availability, Topic::Sla],
    }
}

/// Grade one domain from its topic statements.
pub fn assess(domain: Domain, clauses: &TopicClauses, thresholds: &RiskThresholds) -> Assessment {
    match domain {
        Domain::Legal => legal::assess(clauses, thresholds),
        Domain::Compliance => compliance::assess(clauses),
        Domain::Finance => finance::assess(clauses, thresholds),
        Domain::Operations => operations::assess(clauses, thresholds),
    }
}

/// Result of evaluating one selected domain.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainOutcome {
    pub result: AgentResult,
    pub evidence: Vec<EvidenceItem>,
    /// `(rank, sentence)` when the domain earned an executive summary point.
    pub summary_point: Option<(u8, String)>,
}

/// Retrieve each topic of `domain` from the index, then grade it.
///
/// Confidence is the mean score of every match retrieved for the domain.
pub fn evaluate_domain(domain: Domain, index: &EmbeddingIndex, config: &EngineConfig) -> DomainOutcome {
    let mut clauses = TopicClauses::default();
    let mut scores = Vec::new();

    for &topic in domain_topics(domain) {
        let matches = index.query(topic.query(), config.topic_top_k);
        scores.extend(matches.iter().map(|m| m.score));
        clauses.insert(topic, extract_topic_statements(&matches, topic, topic.max_items()));
    }

    let confidence = (!scores.is_empty()).then(|| scores.iter().sum::<f32>() / scores.len() as f32);
    let assessment = assess(domain, &clauses, &config.thresholds);
    debug!(
        domain = %domain,
        level = %assessment.level,
        evidence = assessment.evidence.len(),
        "domain scored"
    );

    let summary_point = (assessment.level.is_graded() && !assessment.basis.is_empty()).then(|| {
        (
            assessment.level.rank(),
            format!(
                "{} risk is {} based on {} stated in the agreement.",
                domain.title(),
                assessment.level.label(),
                join_phrases(&assessment.basis)
            ),
        )
    });

    let result = if assessment.level == RiskLevel::NotApplicable {
        let finding = assessment.findings.first().map(String::as_str).unwrap_or_default();
        AgentResult::no_clause(domain, finding, confidence)
    } else {
        AgentResult {
            agent_type: domain,
            risk_level: assessment.level,
            findings: assessment.findings,
            evidence: assessment.evidence.iter().map(|e| e.text.clone()).collect(),
            confidence,
            skipped: false,
        }
    };

    DomainOutcome {
        result,
        evidence: assessment.evidence,
        summary_point,
    }
}
