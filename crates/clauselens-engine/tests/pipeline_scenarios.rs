//! End-to-end scenarios over a small master services agreement.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use clauselens_ai::EmbeddingIndex;
use clauselens_core::config::EngineConfig;
use clauselens_core::model::{Domain, Intent, RiskLevel, Tone};
use clauselens_core::rewrite::{BulletRewriter, RewriteRequest};
use clauselens_core::text::collapse_whitespace;
use clauselens_engine::{ContractEngine, NO_EVIDENCE_MESSAGE, PipelineError, PipelineRequest};
use clauselens_store::MemoryStore;

const MSA: &str = "MASTER SERVICES AGREEMENT

1. Payment Terms: Customer will pay within 15 days of invoice.
2. Late Fees: Late payments accrue interest at 1.5% per month.
3. Termination: Either party may terminate for material breach with 30 days cure.
4. Liability: Liability is capped at fees paid, except for uncapped confidentiality breach.
5. SLA: Uptime commitment is 99.9%. Service credits apply if uptime falls below 99.9%.
6. Audit: Customer may audit security controls annually.
";

const LONG_MSA: &str = "MASTER SERVICES AGREEMENT

This Master Services Agreement is entered into between Provider and Customer as of the Effective Date.

1. Definitions: Capitalized terms have the meanings given in Exhibit A.
2. Services: Provider will deliver the hosted software services described in each Order Form.
3. Payment Terms: Customer will pay within 15 days of invoice.
4. Late Fees: Late payments accrue interest at 1.5% per month.
5. Term: This Agreement starts on the Effective Date and continues for three years.
6. Termination: Either party may terminate for material breach with 30 days cure.
7. Liability: Liability is capped at fees paid, except for uncapped confidentiality breach.
8. SLA: Uptime commitment is 99.9%. Service credits apply if uptime falls below 99.9%.
9. Audit Rights: Customer may audit the security controls of Provider once each year.
10. Confidentiality: Each party will protect the confidential information of the other party.
11. Governing Law: This Agreement is governed by the laws of the State of Delaware.
12. Notices: Notices must be delivered in writing to the addresses in the Order Form.
13. Assignment: Neither party may assign this Agreement without prior written consent.
14. Force Majeure: Neither party is responsible for delays caused by events beyond its reasonable control.
15. Independent Contractors: The parties are independent contractors and not partners or agents.
16. Entire Agreement: This Agreement and each Order Form form the entire agreement of the parties.
17. Counterparts: This Agreement may be signed in counterparts, each of which is an original.
";

const RISK_VOCABULARY: &[&str] = &["risk", "confidence", "executive", "overall"];

fn engine() -> ContractEngine {
    ContractEngine::builder().build()
}

fn request(question: &str) -> PipelineRequest {
    PipelineRequest::new(MSA, question)
}

// =============================================================================
// Factual answers
// =============================================================================

#[tokio::test]
async fn payment_fact_question_answers_from_clauses() {
    let (result, report) = engine()
        .run_pipeline(request("Explain the payment terms and late fees"))
        .await
        .unwrap();

    assert_eq!(result.intent, Intent::FactSummary);
    assert!(!result.no_evidence);
    assert!(result.analysis.is_none());
    assert!(result.message.is_none());

    let headings: Vec<&str> = result.qa.sections.iter().map(|s| s.heading.as_str()).collect();
    assert_eq!(headings, vec!["Payment Terms", "Late Fees"]);
    assert!(report.contains("15"));
    assert!(report.contains("1.5"));
    assert!(report.starts_with("Payment Terms\n• "));

    let low = report.to_lowercase();
    for term in RISK_VOCABULARY {
        assert!(!low.contains(term), "report mentions {term:?}: {report}");
    }
    assert!(!low.contains("explain the payment terms"));
}

#[tokio::test]
async fn unrelated_question_is_refused_across_thresholds() {
    let engine = engine();
    for threshold in [0.1, 0.2, 0.25, 0.3, 0.4] {
        let mut req = request("What is the warranty period for hardware?");
        req.no_evidence_threshold = Some(threshold);
        let (result, report) = engine.run_pipeline(req).await.unwrap();

        assert!(result.no_evidence, "threshold {threshold}");
        assert_eq!(result.message.as_deref(), Some(NO_EVIDENCE_MESSAGE));
        assert!(result.qa.sections.is_empty());
        assert_eq!(report, format!("Answer\n• {NO_EVIDENCE_MESSAGE}"));
    }
}

#[tokio::test]
async fn threshold_above_every_score_refuses() {
    let mut req = request("Explain the payment terms and late fees");
    req.no_evidence_threshold = Some(7.0);
    let (result, _) = engine().run_pipeline(req).await.unwrap();
    assert!(result.no_evidence);
    assert!(result.evidence_score.is_some());
}

#[tokio::test]
async fn answers_are_grounded_in_the_contract() {
    let normalized = collapse_whitespace(MSA);
    let engine = engine();
    for question in [
        "Explain the payment terms and late fees",
        "Summarize the termination clause",
        "What are the SLA commitments?",
    ] {
        let (result, _) = engine.run_pipeline(request(question)).await.unwrap();
        for section in &result.qa.sections {
            for bullet in &section.bullets {
                assert!(normalized.contains(bullet.as_str()), "{bullet:?} not in contract");
            }
        }
    }
}

#[tokio::test]
async fn multi_chunk_contract_answers_supported_questions() {
    assert!(LONG_MSA.len() >= 1500);
    let index = EmbeddingIndex::build(LONG_MSA, &EngineConfig::default(), None);
    assert!(index.chunks().len() > 1);

    let engine = engine();
    for question in [
        "Explain the payment terms",
        "Summarize payment terms and late fees",
        "What are the audit rights?",
    ] {
        let (result, report) = engine
            .run_pipeline(PipelineRequest::new(LONG_MSA, question))
            .await
            .unwrap();
        assert!(!result.no_evidence, "{question}: {report}");
        assert!(result.evidence_score.unwrap() >= 0.25, "{question}");
    }

    let (result, report) = engine
        .run_pipeline(PipelineRequest::new(LONG_MSA, "Summarize payment terms and late fees"))
        .await
        .unwrap();
    let headings: Vec<&str> = result.qa.sections.iter().map(|s| s.heading.as_str()).collect();
    assert_eq!(headings, vec!["Payment Terms", "Late Fees"]);
    assert!(report.contains("Customer will pay within 15 days of invoice."));
    assert!(report.contains("Late payments accrue interest at 1.5% per month."));

    let (_, report) = engine
        .run_pipeline(PipelineRequest::new(LONG_MSA, "What are the audit rights?"))
        .await
        .unwrap();
    assert!(report.contains("Customer may audit the security controls of Provider once each year."));
}

#[tokio::test]
async fn multi_chunk_contract_still_refuses_unrelated_questions() {
    let (result, report) = engine()
        .run_pipeline(PipelineRequest::new(LONG_MSA, "What is the warranty period for hardware?"))
        .await
        .unwrap();
    assert!(result.no_evidence);
    assert_eq!(report, format!("Answer\n• {NO_EVIDENCE_MESSAGE}"));
}

// =============================================================================
// Risk analysis
// =============================================================================

#[tokio::test]
async fn payment_risk_question_scores_only_finance() {
    let (result, report) = engine()
        .run_pipeline(request("What are the risks in the payment terms?"))
        .await
        .unwrap();

    assert_eq!(result.intent, Intent::RiskAnalysis);
    assert!(!result.no_evidence);
    assert_eq!(result.selected_domains, vec![Domain::Finance]);

    let analysis = result.analysis.as_ref().unwrap();
    assert!(matches!(analysis.finance.risk_level, RiskLevel::Medium | RiskLevel::Low));
    for domain in [Domain::Legal, Domain::Compliance, Domain::Operations] {
        let r = analysis.domain(domain);
        assert_eq!(r.risk_level, RiskLevel::NotApplicable);
        assert!(r.skipped);
    }
    assert_eq!(analysis.overall_risk, analysis.finance.risk_level);

    assert!(report.starts_with("CONTRACT ANALYSIS REPORT (Executive)"));
    assert!(report.contains("\nFinance\nRisk Level: MEDIUM\n"));
    assert!(report.contains("\nLegal\nRisk Level: N/A\n- Skipped (not relevant to the question).\n"));
    assert!(report.contains("- Payment Terms: Customer will pay within 15 days of invoice."));

    let confidence = result.confidence.as_ref().unwrap();
    assert!(confidence.per_domain[&Domain::Finance].is_some());
    assert!(confidence.per_domain[&Domain::Legal].is_none());
    assert!(result.high_risk_evidence.contains(&"Late payments accrue interest at 1.5% per month.".to_string()));
}

#[tokio::test]
async fn run_all_agents_scores_every_domain() {
    let mut req = request("What are the risks in the payment terms?");
    req.run_all_agents = true;
    let (result, report) = engine().run_pipeline(req).await.unwrap();

    let analysis = result.analysis.unwrap();
    assert_eq!(result.selected_domains, Domain::ALL.to_vec());
    assert_eq!(analysis.finance.risk_level, RiskLevel::Medium);
    assert_eq!(analysis.legal.risk_level, RiskLevel::Medium);
    assert_eq!(analysis.operations.risk_level, RiskLevel::Low);
    assert_eq!(analysis.compliance.risk_level, RiskLevel::Low);
    assert_eq!(analysis.overall_risk, RiskLevel::Medium);
    assert!(analysis.results().iter().all(|r| !r.skipped));
    assert!(analysis.executive_summary_points.len() <= 3);
    assert!(report.contains("- Overall contract risk: MEDIUM"));
}

#[tokio::test]
async fn liability_carve_out_is_medium_with_intent_override() {
    let mut req = request("Tell me about liability");
    req.intent_override = Some("risk_analysis".into());
    let (result, _) = engine().run_pipeline(req).await.unwrap();

    assert_eq!(result.intent, Intent::RiskAnalysis);
    assert_eq!(result.selected_domains, vec![Domain::Legal]);
    let legal = &result.analysis.as_ref().unwrap().legal;
    assert_eq!(legal.risk_level, RiskLevel::Medium);
    assert!(legal.findings.iter().any(|f| f.contains("carve-out")));
}

#[tokio::test]
async fn simple_tone_changes_labels() {
    let mut req = request("What are the risks in the payment terms?");
    req.tone = Tone::Simple;
    let (_, report) = engine().run_pipeline(req).await.unwrap();
    assert!(report.starts_with("CONTRACT ANALYSIS REPORT (Simple)\n\nSummary\n- Overall risk: MEDIUM"));
}

#[tokio::test]
async fn risk_question_without_clauses_is_gated() {
    let contract = "This agreement is governed by the laws of Delaware. Notices must be in writing.";
    let mut req = PipelineRequest::new(contract, "What are the payment risks?");
    req.tone = Tone::Executive;
    let (result, report) = engine().run_pipeline(req).await.unwrap();

    assert!(result.no_evidence);
    let analysis = result.analysis.unwrap();
    assert_eq!(analysis.overall_risk, RiskLevel::Unknown);
    assert_eq!(analysis.finance.risk_level, RiskLevel::Unknown);
    assert!(analysis.finance.findings.is_empty());
    assert_eq!(analysis.legal.risk_level, RiskLevel::NotApplicable);
    assert!(result.high_risk_evidence.is_empty());
    assert_eq!(
        report,
        format!("CONTRACT ANALYSIS REPORT (Executive)\n\n{NO_EVIDENCE_MESSAGE}")
    );
}

// =============================================================================
// Input validation
// =============================================================================

#[tokio::test]
async fn empty_inputs_are_rejected() {
    let engine = engine();
    assert!(matches!(
        engine.run_pipeline(PipelineRequest::new("  \n", "What are the payment terms?")).await,
        Err(PipelineError::EmptyContract)
    ));
    assert!(matches!(
        engine.run_pipeline(PipelineRequest::new(MSA, "   ")).await,
        Err(PipelineError::EmptyQuestion)
    ));
}

#[tokio::test]
async fn contract_id_is_stable() {
    let engine = engine();
    let (a, _) = engine.run_pipeline(request("Explain the payment terms")).await.unwrap();
    let (b, _) = engine.run_pipeline(request("Explain the late fees")).await.unwrap();
    assert_eq!(a.contract_id, b.contract_id);
    assert!(a.contract_id.starts_with("uploaded_"));
    assert_eq!(a.contract_id.len(), "uploaded_".len() + 12);
}

// =============================================================================
// Memory
// =============================================================================

#[tokio::test]
async fn completed_requests_are_remembered() {
    let dir = tempfile::tempdir().unwrap();
    let engine = ContractEngine::builder()
        .memory(MemoryStore::new(dir.path()))
        .build();

    let mut req = request("What are the risks in the payment terms?");
    req.contract_id = Some("msa-1".into());
    let (first, _) = engine.run_pipeline(req.clone()).await.unwrap();
    assert_eq!(first.memory.as_ref().unwrap().prior_records, 0);
    assert!(first.memory.as_ref().unwrap().closest_prior_similarity.is_none());

    let (second, _) = engine.run_pipeline(req).await.unwrap();
    let summary = second.memory.unwrap();
    assert_eq!(summary.prior_records, 1);
    assert!(summary.closest_prior_similarity.unwrap() > 0.999);

    let records = engine.memory().unwrap().load("msa-1").await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].kind, "final");
    assert_eq!(records[0].final_json["contract_id"], "msa-1");
    assert_eq!(records[0].final_json["no_evidence"], false);
}

#[tokio::test]
async fn gated_requests_are_not_remembered() {
    let dir = tempfile::tempdir().unwrap();
    let engine = ContractEngine::builder()
        .memory(MemoryStore::new(dir.path()))
        .build();

    let mut req = request("What is the warranty period for hardware?");
    req.contract_id = Some("msa-2".into());
    let (result, _) = engine.run_pipeline(req).await.unwrap();
    assert!(result.no_evidence);
    assert!(engine.memory().unwrap().load("msa-2").await.unwrap().is_empty());
}

// =============================================================================
// Rewrite strategy
// =============================================================================

struct Paraphraser;

#[async_trait]
impl BulletRewriter for Paraphraser {
    fn name(&self) -> &str {
        "paraphraser"
    }

    async fn rewrite(&self, request: &RewriteRequest) -> Option<String> {
        if request.clause.contains("15 days") {
            Some("• Customer pays within 15 days of invoice.".into())
        } else if request.clause.contains("1.5%") {
            // Introduces a number the clause does not contain.
            Some("Late payments accrue interest at 3% per month.".into())
        } else {
            None
        }
    }
}

#[tokio::test]
async fn rewrites_are_validated_before_use() {
    let engine = ContractEngine::builder().rewriter(Arc::new(Paraphraser)).build();
    let (result, report) = engine
        .run_pipeline(request("Explain the payment terms and late fees"))
        .await
        .unwrap();

    assert_eq!(
        result.qa.sections[0].bullets,
        vec!["Customer pays within 15 days of invoice."]
    );
    assert_eq!(
        result.qa.sections[1].bullets,
        vec!["Late payments accrue interest at 1.5% per month."]
    );
    assert!(!report.contains("3%"));
}

/// Keeps every clause and counts how often it is asked.
#[derive(Default)]
struct CountingRewriter {
    calls: AtomicUsize,
}

#[async_trait]
impl BulletRewriter for CountingRewriter {
    fn name(&self) -> &str {
        "counting"
    }

    async fn rewrite(&self, _request: &RewriteRequest) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        None
    }
}

#[tokio::test]
async fn rewrites_are_only_requested_for_supported_fact_answers() {
    let rewriter = Arc::new(CountingRewriter::default());
    let engine = ContractEngine::builder().rewriter(rewriter.clone()).build();

    engine
        .run_pipeline(request("What is the warranty period for hardware?"))
        .await
        .unwrap();
    engine
        .run_pipeline(request("What are the risks in the payment terms?"))
        .await
        .unwrap();
    assert_eq!(rewriter.calls.load(Ordering::SeqCst), 0);

    let (result, _) = engine
        .run_pipeline(request("Explain the payment terms and late fees"))
        .await
        .unwrap();
    assert!(!result.no_evidence);
    assert_eq!(rewriter.calls.load(Ordering::SeqCst), 2);
}
