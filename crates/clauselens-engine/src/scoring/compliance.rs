//! Compliance: privacy, breach notification, retention and audit language.

use std::sync::LazyLock;

use regex::Regex;

use clauselens_ai::Topic;
use clauselens_core::model::RiskLevel;
use clauselens_core::text::contains_any;

use super::{Assessment, TopicClauses};

const NO_CLAUSE: &str = "No relevant clause identified for privacy/data protection, breach notification, retention, or audit/security controls in the provided text.";

const PRIVACY_TERMS: &[&str] = &["privacy", "data protection", "personal data", "gdpr", "hipaa"];
const NOTIFICATION_TERMS: &[&str] = &["breach", "incident", "notif"];

static DEADLINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:immediately|within\s+24\s+hours?|24\s+hours)\b").expect("static regex")
});

pub fn assess(clauses: &TopicClauses) -> Assessment {
    let statements = clauses.get(Topic::Compliance);
    let Some(first) = statements.first() else {
        return Assessment::no_clause(NO_CLAUSE);
    };

    let lowered: Vec<String> = statements.iter().map(|s| s.to_lowercase()).collect();
    let any = |terms: &[&str]| lowered.iter().any(|s| contains_any(s, terms));

    let deadline = statements
        .iter()
        .find_map(|s| DEADLINE.find(s))
        .map(|m| m.as_str().to_string());
    let level = if deadline.is_some() {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    let mut findings = Vec::new();
    if let Some(deadline) = &deadline {
        findings.push(format!("Notification is required {deadline}."));
    }
    if any(&["audit"]) {
        findings.push("The contract grants audit rights.".to_string());
    }
    if any(&["security"]) {
        findings.push("The contract references security controls.".to_string());
    }
    if any(&["retention", "retain"]) {
        findings.push("The contract sets data retention obligations.".to_string());
    }
    if any(&["subprocessor", "sub-processor"]) {
        findings.push("The contract addresses the use of subprocessors.".to_string());
    }
    if !any(PRIVACY_TERMS) {
        findings.push(
            "No explicit privacy/data protection obligations were identified in the provided text."
                .to_string(),
        );
    }
    if !any(NOTIFICATION_TERMS) {
        findings.push(
            "No explicit breach notification/incident reporting obligations were identified in the provided text."
                .to_string(),
        );
    }

    Assessment {
        level,
        findings,
        evidence: vec![Assessment::evidence(Topic::Compliance.heading(), first)],
        basis: vec!["the compliance-related language"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grade(statements: &[&str]) -> Assessment {
        let clauses = TopicClauses::from([(
            Topic::Compliance,
            statements.iter().map(|s| s.to_string()).collect(),
        )]);
        assess(&clauses)
    }

    #[test]
    fn audit_clause_is_low_and_notes_gaps() {
        let a = grade(&["Customer may audit security controls annually."]);
        assert_eq!(a.level, RiskLevel::Low);
        assert_eq!(
            a.findings,
            vec![
                "The contract grants audit rights.",
                "The contract references security controls.",
                "No explicit privacy/data protection obligations were identified in the provided text.",
                "No explicit breach notification/incident reporting obligations were identified in the provided text."
            ]
        );
        assert_eq!(a.evidence[0].label, "Compliance");
    }

    #[test]
    fn twenty_four_hour_notice_is_medium() {
        let a = grade(&[
            "Provider shall notify Customer of any security incident within 24 hours.",
            "Personal data is processed under the data protection addendum.",
        ]);
        assert_eq!(a.level, RiskLevel::Medium);
        assert_eq!(a.findings[0], "Notification is required within 24 hours.");
        assert!(!a.findings.iter().any(|f| f.starts_with("No explicit")));
    }

    #[test]
    fn no_clauses_is_not_applicable() {
        let a = grade(&[]);
        assert_eq!(a.level, RiskLevel::NotApplicable);
        assert_eq!(a.findings, vec![NO_CLAUSE]);
    }
}
