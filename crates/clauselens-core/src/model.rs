//! Shared data model for the contract query pipeline.
//!
//! Everything here is a plain value: built once per request, serialised into
//! the final JSON payload, and never mutated after aggregation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to parse one of the string-backed enums below.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// A contiguous window of whitespace-normalized contract text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

/// A ranked retrieval result. `score` is cosine similarity in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMatch {
    pub score: f32,
    pub chunk_index: usize,
    pub text: String,
}

// ── Intent ──

/// What the caller is asking for, which decides the answer's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    FactSummary,
    Qa,
    ClauseExtraction,
    RiskAnalysis,
    ExecutiveReview,
}

impl Intent {
    pub const ALL: [Intent; 5] = [
        Intent::FactSummary,
        Intent::Qa,
        Intent::ClauseExtraction,
        Intent::RiskAnalysis,
        Intent::ExecutiveReview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FactSummary => "fact_summary",
            Self::Qa => "qa",
            Self::ClauseExtraction => "clause_extraction",
            Self::RiskAnalysis => "risk_analysis",
            Self::ExecutiveReview => "executive_review",
        }
    }

    /// Risk and executive intents produce the multi-domain report; the rest
    /// produce a minimal bulleted answer.
    pub fn is_risk_review(&self) -> bool {
        matches!(self, Self::RiskAnalysis | Self::ExecutiveReview)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|i| i.as_str() == wanted)
            .ok_or_else(|| ParseEnumError {
                kind: "intent",
                value: s.to_string(),
            })
    }
}

// ── Risk ──

/// Risk grade for a domain or the whole contract.
///
/// `NotApplicable` means the domain was deliberately not evaluated (skipped, or
/// no clause for it exists); `Unknown` means it was evaluated without a
/// conclusive grounded signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    #[serde(rename = "n/a")]
    NotApplicable,
    Unknown,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::NotApplicable => "n/a",
            Self::Unknown => "unknown",
        }
    }

    /// Upper-case label used in rendered reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::NotApplicable => "N/A",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Ordering used for worst-wins aggregation. Ungraded levels rank 0.
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
            Self::NotApplicable | Self::Unknown => 0,
        }
    }

    /// True for `low`, `medium` and `high`.
    pub fn is_graded(&self) -> bool {
        self.rank() > 0
    }

    /// Worst graded level in `levels`, or `Unknown` when none is graded.
    pub fn max_of<I: IntoIterator<Item = RiskLevel>>(levels: I) -> RiskLevel {
        levels
            .into_iter()
            .filter(RiskLevel::is_graded)
            .max_by_key(RiskLevel::rank)
            .unwrap_or(RiskLevel::Unknown)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Domains and tone ──

/// One of the four business review lenses, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Legal,
    Compliance,
    Finance,
    Operations,
}

impl Domain {
    pub const ALL: [Domain; 4] = [
        Domain::Legal,
        Domain::Compliance,
        Domain::Finance,
        Domain::Operations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legal => "legal",
            Self::Compliance => "compliance",
            Self::Finance => "finance",
            Self::Operations => "operations",
        }
    }

    /// Section title used in reports.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Legal => "Legal",
            Self::Compliance => "Compliance",
            Self::Finance => "Finance",
            Self::Operations => "Operations",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == wanted)
            .ok_or_else(|| ParseEnumError {
                kind: "domain",
                value: s.to_string(),
            })
    }
}

/// Audience for the rendered report. Only wording changes between tones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Executive,
    Simple,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Executive => "executive",
            Self::Simple => "simple",
        }
    }
}

impl FromStr for Tone {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "executive" => Ok(Self::Executive),
            "simple" => Ok(Self::Simple),
            _ => Err(ParseEnumError {
                kind: "tone",
                value: s.to_string(),
            }),
        }
    }
}

// ── Domain results ──

/// Finding recorded for a domain that was not selected for the question.
pub const SKIPPED_FINDING: &str = "Skipped (not relevant to the question).";

/// Outcome of one domain scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent_type: Domain,
    pub risk_level: RiskLevel,
    pub findings: Vec<String>,
    pub evidence: Vec<String>,
    pub confidence: Option<f32>,
    /// Set only when the domain was not selected for this question.
    #[serde(default)]
    pub skipped: bool,
}

impl AgentResult {
    /// Placeholder for a domain that was not selected.
    pub fn skipped(domain: Domain) -> Self {
        Self {
            agent_type: domain,
            risk_level: RiskLevel::NotApplicable,
            findings: vec![SKIPPED_FINDING.to_string()],
            evidence: Vec::new(),
            confidence: None,
            skipped: true,
        }
    }

    /// A selected domain whose topics matched no clause.
    pub fn no_clause(domain: Domain, finding: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            agent_type: domain,
            risk_level: RiskLevel::NotApplicable,
            findings: vec![finding.into()],
            evidence: Vec::new(),
            confidence,
            skipped: false,
        }
    }

    /// A selected domain in a request that failed the evidence gate.
    pub fn inconclusive(domain: Domain) -> Self {
        Self {
            agent_type: domain,
            risk_level: RiskLevel::Unknown,
            findings: Vec::new(),
            evidence: Vec::new(),
            confidence: None,
            skipped: false,
        }
    }
}

/// A labelled clause excerpt backing a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub label: String,
    pub text: String,
}

/// Aggregate of the four domain results, assembled once at fan-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveAnalysis {
    pub legal: AgentResult,
    pub compliance: AgentResult,
    pub finance: AgentResult,
    pub operations: AgentResult,
    pub overall_risk: RiskLevel,
    pub executive_summary_points: Vec<String>,
    pub key_evidence: Vec<EvidenceItem>,
}

impl ExecutiveAnalysis {
    pub fn domain(&self, domain: Domain) -> &AgentResult {
        match domain {
            Domain::Legal => &self.legal,
            Domain::Compliance => &self.compliance,
            Domain::Finance => &self.finance,
            Domain::Operations => &self.operations,
        }
    }

    /// Domain results in report order.
    pub fn results(&self) -> [&AgentResult; 4] {
        [&self.legal, &self.compliance, &self.finance, &self.operations]
    }

    pub fn has_evidence(&self) -> bool {
        !self.key_evidence.is_empty()
    }
}

// ── Answers ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaSection {
    pub heading: String,
    pub bullets: Vec<String>,
}

/// Topic-scoped answer: one section per requested topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaAnswer {
    pub question: String,
    pub answer: String,
    pub sections: Vec<QaSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceSummary {
    pub overall_avg: Option<f32>,
    pub per_domain: BTreeMap<Domain, Option<f32>>,
}

/// Debug view of the per-contract memory log at answer time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySummary {
    pub prior_records: usize,
    pub closest_prior_similarity: Option<f32>,
}

/// Complete, well-formed result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    pub contract_id: String,
    pub generated_at: DateTime<Utc>,
    pub intent: Intent,
    pub question: String,
    pub qa: QaAnswer,
    pub analysis: Option<ExecutiveAnalysis>,
    /// Probe matches, kept so a front end can highlight the retrieved text.
    pub probe: Vec<RetrievalMatch>,
    pub selected_domains: Vec<Domain>,
    pub confidence: Option<ConfidenceSummary>,
    pub high_risk_evidence: Vec<String>,
    pub no_evidence: bool,
    pub evidence_score: Option<f32>,
    pub message: Option<String>,
    pub memory: Option<MemorySummary>,
    pub report: String,
}

/// One append-only entry in a contract's memory log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: DateTime<Utc>,
    pub question: String,
    pub question_embedding: Vec<f32>,
    pub final_json: serde_json::Value,
}
