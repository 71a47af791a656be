//! Plain-text rendering of the executive risk report.
//!
//! The report is built only from the aggregated analysis: the question is never
//! repeated and every finding and evidence line comes from extracted clauses.

use std::collections::HashSet;

use clauselens_core::model::{Domain, ExecutiveAnalysis, Tone};
use clauselens_core::text::{collapse_whitespace, truncate_chars};

use crate::gate::NO_EVIDENCE_MESSAGE;

const MAX_FINDINGS: usize = 2;
const MAX_EVIDENCE_ITEMS: usize = 10;
const MAX_EVIDENCE_CHARS: usize = 240;
const MIN_EVIDENCE_CHARS: usize = 10;

const NO_FINDINGS: &str = "No relevant clause identified.";
const NO_EVIDENCE_EXTRACTED: &str = "No supporting clause evidence extracted.";

// ── Tone templates ──

struct ToneLabels {
    title: &'static str,
    summary: &'static str,
    overall: &'static str,
    level: &'static str,
    evidence: &'static str,
}

const EXECUTIVE: ToneLabels = ToneLabels {
    title: "CONTRACT ANALYSIS REPORT (Executive)",
    summary: "Executive Summary",
    overall: "Overall contract risk",
    level: "Risk Level",
    evidence: "Key Evidence",
};

const SIMPLE: ToneLabels = ToneLabels {
    title: "CONTRACT ANALYSIS REPORT (Simple)",
    summary: "Summary",
    overall: "Overall risk",
    level: "Risk",
    evidence: "Evidence",
};

fn labels(tone: Tone) -> &'static ToneLabels {
    match tone {
        Tone::Executive => &EXECUTIVE,
        Tone::Simple => &SIMPLE,
    }
}

// ── Public API ──

/// Clean one evidence excerpt for display.
///
/// Whitespace is collapsed; excerpts shorter than ten characters or not
/// starting with an ASCII letter are dropped.
pub fn sanitize_evidence(text: &str) -> Option<String> {
    let cleaned = collapse_whitespace(text);
    if cleaned.chars().count() < MIN_EVIDENCE_CHARS {
        return None;
    }
    if !cleaned.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(cleaned)
}

/// Render the multi-domain report: summary, one section per domain in report
/// order, then key evidence.
pub fn render_executive_report(analysis: &ExecutiveAnalysis, tone: Tone) -> String {
    let t = labels(tone);
    let mut lines: Vec<String> = vec![t.title.to_string(), String::new()];

    lines.push(t.summary.to_string());
    lines.push(format!("- {}: {}", t.overall, analysis.overall_risk.label()));
    for point in analysis.executive_summary_points.iter().filter(|p| !p.trim().is_empty()) {
        lines.push(format!("- {point}"));
    }

    for domain in Domain::ALL {
        let result = analysis.domain(domain);
        lines.push(String::new());
        lines.push(domain.title().to_string());
        lines.push(format!("{}: {}", t.level, result.risk_level.label()));
        let findings: Vec<&String> = result
            .findings
            .iter()
            .filter(|f| !f.trim().is_empty())
            .take(MAX_FINDINGS)
            .collect();
        if findings.is_empty() {
            lines.push(format!("- {NO_FINDINGS}"));
        }
        for finding in findings {
            lines.push(format!("- {finding}"));
        }
    }

    lines.push(String::new());
    lines.push(t.evidence.to_string());
    let mut seen = HashSet::new();
    let evidence: Vec<String> = analysis
        .key_evidence
        .iter()
        .filter_map(|item| {
            let text = sanitize_evidence(&item.text)?;
            seen.insert(text.to_lowercase()).then(|| {
                let label = if item.label.trim().is_empty() { "Evidence" } else { item.label.trim() };
                format!("- {label}: {}", truncate_chars(&text, MAX_EVIDENCE_CHARS))
            })
        })
        .take(MAX_EVIDENCE_ITEMS)
        .collect();
    if evidence.is_empty() {
        lines.push(format!("- {NO_EVIDENCE_EXTRACTED}"));
    }
    lines.extend(evidence);

    lines.join("\n").trim().to_string()
}

/// Report for a risk request that failed the evidence gate.
pub fn render_gated_risk_report(tone: Tone) -> String {
    format!("{}\n\n{NO_EVIDENCE_MESSAGE}", labels(tone).title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clauselens_core::model::{AgentResult, EvidenceItem, RiskLevel};

    fn analysis() -> ExecutiveAnalysis {
        let finance = AgentResult {
            agent_type: Domain::Finance,
            risk_level: RiskLevel::Medium,
            findings: vec![
                "Payment Terms require payment within 15 days of invoice.".into(),
                "Late Fees accrue interest at 1.5% per month (as written in the late-fee clause).".into(),
                "A third finding that is never shown.".into(),
            ],
            evidence: vec![],
            confidence: Some(0.4),
            skipped: false,
        };
        ExecutiveAnalysis {
            legal: AgentResult::skipped(Domain::Legal),
            compliance: AgentResult::skipped(Domain::Compliance),
            finance,
            operations: AgentResult::no_clause(Domain::Operations, "No relevant clause identified for service availability / service levels (SLA) in the provided text.", None),
            overall_risk: RiskLevel::Medium,
            executive_summary_points: vec![
                "Finance risk is MEDIUM based on the payment timing and the late-fee structure stated in the agreement.".into(),
            ],
            key_evidence: vec![
                EvidenceItem {
                    label: "Payment Terms".into(),
                    text: "Customer will pay within 15 days of invoice.".into(),
                },
                EvidenceItem {
                    label: "Payment Terms".into(),
                    text: "Customer  will pay within 15 days of invoice.".into(),
                },
                EvidenceItem {
                    label: "Late Fees".into(),
                    text: "1.5% per month".into(),
                },
            ],
        }
    }

    #[test]
    fn executive_layout() {
        let report = render_executive_report(&analysis(), Tone::Executive);
        let expected = "\
CONTRACT ANALYSIS REPORT (Executive)

Executive Summary
- Overall contract risk: MEDIUM
- Finance risk is MEDIUM based on the payment timing and the late-fee structure stated in the agreement.

Legal
Risk Level: N/A
- Skipped (not relevant to the question).

Compliance
Risk Level: N/A
- Skipped (not relevant to the question).

Finance
Risk Level: MEDIUM
- Payment Terms require payment within 15 days of invoice.
- Late Fees accrue interest at 1.5% per month (as written in the late-fee clause).

Operations
Risk Level: N/A
- No relevant clause identified for service availability / service levels (SLA) in the provided text.

Key Evidence
- Payment Terms: Customer will pay within 15 days of invoice.";
        assert_eq!(report, expected);
    }

    #[test]
    fn simple_tone_changes_labels_only() {
        let report = render_executive_report(&analysis(), Tone::Simple);
        assert!(report.starts_with("CONTRACT ANALYSIS REPORT (Simple)\n\nSummary\n- Overall risk: MEDIUM"));
        assert!(report.contains("\nRisk: MEDIUM\n"));
        assert!(report.contains("\nEvidence\n- Payment Terms: Customer will pay"));
        assert!(!report.contains("Key Evidence"));
    }

    #[test]
    fn empty_evidence_has_placeholder() {
        let mut a = analysis();
        a.key_evidence.clear();
        let report = render_executive_report(&a, Tone::Executive);
        assert!(report.ends_with("Key Evidence\n- No supporting clause evidence extracted."));
    }

    #[test]
    fn evidence_is_sanitized() {
        assert_eq!(sanitize_evidence("  Customer   will pay.\n"), Some("Customer will pay.".into()));
        assert_eq!(sanitize_evidence("Too short"), None);
        assert_eq!(sanitize_evidence("1.5% per month interest"), None);
        assert_eq!(sanitize_evidence("(a) the Customer shall pay"), None);
    }

    #[test]
    fn long_evidence_is_clipped() {
        let mut a = analysis();
        a.key_evidence = vec![EvidenceItem {
            label: "Termination".into(),
            text: format!("Either party {}", "x".repeat(400)),
        }];
        let report = render_executive_report(&a, Tone::Executive);
        let line = report.lines().last().unwrap();
        assert_eq!(line.chars().count(), "- Termination: ".len() + MAX_EVIDENCE_CHARS);
    }

    #[test]
    fn gated_report_is_title_and_message() {
        assert_eq!(
            render_gated_risk_report(Tone::Executive),
            "CONTRACT ANALYSIS REPORT (Executive)\n\nNo relevant evidence found in the provided document for this question."
        );
    }
}
