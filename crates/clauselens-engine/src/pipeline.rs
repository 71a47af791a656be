//! End-to-end request handling.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use clauselens_ai::{EmbeddingIndex, TextEmbedder, cosine_similarity, resolve_intent};
use clauselens_core::config::EngineConfig;
use clauselens_core::model::{
    ConfidenceSummary, Domain, ExecutiveAnalysis, FinalResult, MemoryRecord, MemorySummary,
    QaAnswer, Tone,
};
use clauselens_core::rewrite::{BulletRewriter, NoopRewriter};
use clauselens_core::stable_contract_id;
use clauselens_store::MemoryStore;

use crate::answer::{build_answer, render_fact_report};
use crate::error::PipelineError;
use crate::gate::{NO_EVIDENCE_MESSAGE, Probe, fact_is_gated, gated_analysis, risk_is_gated};
use crate::orchestrator::{aggregate, run_domains, select_domains};
use crate::report::{render_executive_report, render_gated_risk_report};

/// Vocabulary that marks a domain evidence clause as high-risk.
const HIGH_RISK_TERMS: &[&str] = &[
    "penalt",
    "late fee",
    "interest",
    "termination",
    "breach",
    "indemn",
    "liability",
    "service credit",
    "audit",
    "privacy",
    "security",
    "incident",
    "retention",
    "subprocessor",
    "uncapped",
    "unlimited",
    "limitation of liability",
];
const MAX_HIGH_RISK_EVIDENCE: usize = 12;

/// One question against one contract.
#[derive(Debug, Clone, Default)]
pub struct PipelineRequest {
    pub contract_text: String,
    pub question: String,
    pub tone: Tone,
    /// Memory key; derived from the text when absent.
    pub contract_id: Option<String>,
    /// Probe score below which factual questions are refused. Falls back to the
    /// engine config and is clamped to `[0, 1]`.
    pub no_evidence_threshold: Option<f32>,
    /// Intent name that bypasses classification when recognized.
    pub intent_override: Option<String>,
    /// Evaluate every domain regardless of the question.
    pub run_all_agents: bool,
}

impl PipelineRequest {
    pub fn new(contract_text: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            contract_text: contract_text.into(),
            question: question.into(),
            ..Self::default()
        }
    }
}

/// Long-lived engine: configuration, embedder, rewrite strategy and memory.
///
/// Holds no per-request state; each run builds its own index.
pub struct ContractEngine {
    config: Arc<EngineConfig>,
    embedder: Option<Arc<dyn TextEmbedder>>,
    rewriter: Arc<dyn BulletRewriter>,
    memory: Option<MemoryStore>,
}

#[derive(Default)]
pub struct ContractEngineBuilder {
    config: EngineConfig,
    embedder: Option<Arc<dyn TextEmbedder>>,
    rewriter: Option<Arc<dyn BulletRewriter>>,
    memory: Option<MemoryStore>,
}

impl ContractEngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Semantic embedder; the hashing embedder is used without one.
    pub fn embedder(mut self, embedder: Arc<dyn TextEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn rewriter(mut self, rewriter: Arc<dyn BulletRewriter>) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    /// Memory store; overrides `memory_dir` from the config.
    pub fn memory(mut self, store: MemoryStore) -> Self {
        self.memory = Some(store);
        self
    }

    pub fn build(self) -> ContractEngine {
        let memory = self
            .memory
            .or_else(|| self.config.memory_dir.clone().map(MemoryStore::new));
        ContractEngine {
            config: Arc::new(self.config),
            embedder: self.embedder,
            rewriter: self.rewriter.unwrap_or_else(|| Arc::new(NoopRewriter)),
            memory,
        }
    }
}

impl ContractEngine {
    pub fn builder() -> ContractEngineBuilder {
        ContractEngineBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn memory(&self) -> Option<&MemoryStore> {
        self.memory.as_ref()
    }

    /// Answer `request` and render its report.
    ///
    /// Unsupported questions are not errors: they return a result with
    /// `no_evidence` set and are not written to memory.
    pub async fn run_pipeline(
        &self,
        request: PipelineRequest,
    ) -> Result<(FinalResult, String), PipelineError> {
        if request.contract_text.trim().is_empty() {
            return Err(PipelineError::EmptyContract);
        }
        let question = request.question.trim().to_string();
        if question.is_empty() {
            return Err(PipelineError::EmptyQuestion);
        }

        let contract_id = request
            .contract_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| stable_contract_id(&request.contract_text));
        let intent = resolve_intent(&question, request.intent_override.as_deref());
        let threshold = request
            .no_evidence_threshold
            .unwrap_or(self.config.no_evidence_threshold)
            .clamp(0.0, 1.0);

        let index = Arc::new(EmbeddingIndex::build(
            &request.contract_text,
            &self.config,
            self.embedder.clone(),
        ));
        let probe = Probe::run(&index, &question, self.config.probe_top_k);
        debug!(intent = %intent, best = ?probe.best_score, threshold, "probed question");

        let mut qa = QaAnswer {
            question: question.clone(),
            ..QaAnswer::default()
        };

        let mut analysis: Option<ExecutiveAnalysis> = None;
        let mut selected_domains = Vec::new();
        let mut confidence = None;
        let mut high_risk_evidence = Vec::new();

        let (gated, report) = if intent.is_risk_review() {
            selected_domains = select_domains(&question, request.run_all_agents);
            let outcomes =
                run_domains(Arc::clone(&index), Arc::clone(&self.config), &selected_domains).await?;
            let per_domain: BTreeMap<Domain, Option<f32>> = Domain::ALL
                .into_iter()
                .map(|d| {
                    let conf = outcomes
                        .iter()
                        .find(|(domain, _)| *domain == d)
                        .and_then(|(_, o)| o.result.confidence);
                    (d, conf)
                })
                .collect();
            let built = aggregate(outcomes);

            if risk_is_gated(&built) {
                analysis = Some(gated_analysis(&selected_domains));
                confidence = Some(ConfidenceSummary::default());
                (true, render_gated_risk_report(request.tone))
            } else {
                let values: Vec<f32> = per_domain.values().flatten().copied().collect();
                let overall_avg =
                    (!values.is_empty()).then(|| values.iter().sum::<f32>() / values.len() as f32);
                confidence = Some(ConfidenceSummary {
                    overall_avg,
                    per_domain,
                });
                high_risk_evidence = collect_high_risk_evidence(&built);
                let report = render_executive_report(&built, request.tone);
                analysis = Some(built);
                (false, report)
            }
        } else {
            // Rewrites are only requested once the probe supports an answer.
            if probe.supports(threshold) {
                qa = build_answer(&question, &probe.matches, self.rewriter.as_ref()).await;
            }
            let gated = fact_is_gated(&probe, threshold, &qa);
            if gated {
                qa.sections.clear();
                qa.answer.clear();
            }
            (gated, render_fact_report(&qa))
        };

        let question_embedding = index.embed_query(&question);
        let memory = match &self.memory {
            Some(store) => Some(self.memory_summary(store, &contract_id, &question_embedding).await),
            None => None,
        };

        let result = FinalResult {
            contract_id: contract_id.clone(),
            generated_at: Utc::now(),
            intent,
            question: question.clone(),
            qa,
            analysis,
            probe: probe.matches,
            selected_domains,
            confidence,
            high_risk_evidence,
            no_evidence: gated,
            evidence_score: probe.best_score,
            message: gated.then(|| NO_EVIDENCE_MESSAGE.to_string()),
            memory,
            report: report.clone(),
        };

        if let Some(store) = self.memory.as_ref().filter(|_| !gated) {
            remember(store, &result, question_embedding).await;
        }

        info!(
            contract_id = %contract_id,
            intent = %intent,
            no_evidence = gated,
            embedder = index.embedder_name(),
            "pipeline complete"
        );
        Ok((result, report))
    }

    async fn memory_summary(
        &self,
        store: &MemoryStore,
        contract_id: &str,
        question_embedding: &[f32],
    ) -> MemorySummary {
        let records = match store.load(contract_id).await {
            Ok(records) => records,
            Err(e) => {
                warn!(contract_id, error = %e, "memory load failed");
                Vec::new()
            }
        };
        let closest_prior_similarity = records
            .iter()
            .filter_map(|r| cosine_similarity(&r.question_embedding, question_embedding))
            .reduce(f32::max);
        MemorySummary {
            prior_records: records.len(),
            closest_prior_similarity,
        }
    }
}

async fn remember(store: &MemoryStore, result: &FinalResult, question_embedding: Vec<f32>) {
    let final_json = match serde_json::to_value(result) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "could not serialize result for memory");
            return;
        }
    };
    let record = MemoryRecord {
        kind: "final".to_string(),
        timestamp: result.generated_at,
        question: result.question.clone(),
        question_embedding,
        final_json,
    };
    if let Err(e) = store.append(&result.contract_id, record).await {
        warn!(contract_id = %result.contract_id, error = %e, "memory append failed");
    }
}

/// Domain evidence clauses carrying high-risk vocabulary, first occurrence
/// only, in report order.
fn collect_high_risk_evidence(analysis: &ExecutiveAnalysis) -> Vec<String> {
    let mut seen = HashSet::new();
    analysis
        .results()
        .into_iter()
        .flat_map(|r| r.evidence.iter())
        .filter(|e| {
            let low = e.to_lowercase();
            HIGH_RISK_TERMS.iter().any(|t| low.contains(t))
        })
        .filter(|e| {
            let key = e.trim().to_lowercase();
            !key.is_empty() && seen.insert(key)
        })
        .take(MAX_HIGH_RISK_EVIDENCE)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clauselens_core::model::{AgentResult, RiskLevel};

    #[test]
    fn high_risk_evidence_is_filtered_and_deduplicated() {
        let mut legal = AgentResult::no_clause(Domain::Legal, "x", None);
        legal.evidence = vec![
            "Either party may terminate for material breach with 30 days cure.".into(),
            "Liability is capped at fees paid, except for uncapped confidentiality breach.".into(),
        ];
        let mut finance = AgentResult::no_clause(Domain::Finance, "x", None);
        finance.evidence = vec![
            "Customer will pay within 15 days of invoice.".into(),
            "Late payments accrue interest at 1.5% per month.".into(),
            " either party may terminate for material breach with 30 days cure.".into(),
        ];
        let analysis = ExecutiveAnalysis {
            legal,
            compliance: AgentResult::skipped(Domain::Compliance),
            finance,
            operations: AgentResult::skipped(Domain::Operations),
            overall_risk: RiskLevel::Medium,
            executive_summary_points: vec![],
            key_evidence: vec![],
        };
        assert_eq!(
            collect_high_risk_evidence(&analysis),
            vec![
                "Either party may terminate for material breach with 30 days cure.",
                "Liability is capped at fees paid, except for uncapped confidentiality breach.",
                "Late payments accrue interest at 1.5% per month.",
            ]
        );
    }

    #[test]
    fn builder_defaults() {
        let engine = ContractEngine::builder().build();
        assert!(engine.memory().is_none());
        assert_eq!(engine.config(), &EngineConfig::default());
    }

    #[test]
    fn builder_uses_config_memory_dir() {
        let config = EngineConfig {
            memory_dir: Some("/tmp/clauselens-memory".into()),
            ..EngineConfig::default()
        };
        let engine = ContractEngine::builder().config(config).build();
        assert_eq!(
            engine.memory().map(|m| m.dir().to_path_buf()),
            Some("/tmp/clauselens-memory".into())
        );
    }
}
