//! Evidence gate: refuse to answer when the contract does not support it.

use clauselens_ai::EmbeddingIndex;
use clauselens_core::model::{
    AgentResult, Domain, ExecutiveAnalysis, QaAnswer, RetrievalMatch, RiskLevel,
};

pub const NO_EVIDENCE_MESSAGE: &str =
    "No relevant evidence found in the provided document for this question.";

/// Retrieval on the raw question, used to decide whether anything supports it.
///
/// With hashing vectors the best score is taken over the clauses of the
/// retrieved chunks as well as the chunks themselves.
#[derive(Debug, Clone, Default)]
pub(crate) struct Probe {
    pub matches: Vec<RetrievalMatch>,
    pub best_score: Option<f32>,
}

impl Probe {
    pub fn run(index: &EmbeddingIndex, question: &str, top_k: usize) -> Self {
        let matches = index.query(question, top_k);
        let chunk_best = matches.iter().map(|m| m.score).reduce(f32::max);
        let best_score = if index.is_semantic() {
            chunk_best
        } else {
            [chunk_best, index.clause_score(question, &matches)]
                .into_iter()
                .flatten()
                .reduce(f32::max)
        };
        Self {
            matches,
            best_score,
        }
    }

    /// Whether the best score reaches `threshold`.
    pub fn supports(&self, threshold: f32) -> bool {
        self.best_score.is_some_and(|s| s >= threshold)
    }
}

/// Factual intents need a probe score at or above `threshold` and at least one
/// topic-scoped answer section.
pub(crate) fn fact_is_gated(probe: &Probe, threshold: f32, qa: &QaAnswer) -> bool {
    !probe.supports(threshold) || qa.sections.is_empty()
}

/// Risk intents need at least one extracted clause across the selected domains.
pub(crate) fn risk_is_gated(analysis: &ExecutiveAnalysis) -> bool {
    !analysis.has_evidence()
}

/// Analysis returned for a gated risk request: evaluated domains are
/// `unknown`, the rest `n/a`, with no findings or evidence.
pub(crate) fn gated_analysis(selected: &[Domain]) -> ExecutiveAnalysis {
    let result = |d: Domain| {
        if selected.contains(&d) {
            AgentResult::inconclusive(d)
        } else {
            AgentResult {
                findings: Vec::new(),
                ..AgentResult::skipped(d)
            }
        }
    };
    ExecutiveAnalysis {
        legal: result(Domain::Legal),
        compliance: result(Domain::Compliance),
        finance: result(Domain::Finance),
        operations: result(Domain::Operations),
        overall_risk: RiskLevel::Unknown,
        executive_summary_points: Vec::new(),
        key_evidence: Vec::new(),
    }
}
