//! Operations: service availability and SLA terms.

use std::sync::LazyLock;

use regex::Regex;

use clauselens_ai::Topic;
use clauselens_core::config::RiskThresholds;
use clauselens_core::model::RiskLevel;
use clauselens_core::text::contains_term;

use super::{Assessment, TopicClauses};

const NO_CLAUSE: &str = "No relevant clause identified for service availability / service levels (SLA) in the provided text.";

// "uptime ... 99.9%": the first percentage after uptime wording in the same sentence.
static UPTIME_AFTER_TERM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:uptime|availability|available)\b[^.;%]*?\b(\d{2,3}(?:\.\d+)?)\s*%")
        .expect("static regex")
});

// "99.9% uptime"
static UPTIME_BEFORE_TERM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{2,3}(?:\.\d+)?)\s*%\s+(?:uptime|availability|available)\b")
        .expect("static regex")
});

/// First uptime percentage in `clauses`, as written and parsed. Percentages
/// not tied to uptime or availability wording (credit rates, fee shares) are
/// ignored.
fn uptime(clauses: &[&str]) -> Option<(String, f32)> {
    clauses.iter().find_map(|clause| {
        let caps = UPTIME_AFTER_TERM
            .captures(clause)
            .or_else(|| UPTIME_BEFORE_TERM.captures(clause))?;
        let raw = caps.get(1)?.as_str();
        let pct = raw.parse().ok()?;
        Some((raw.to_string(), pct))
    })
}

pub fn assess(clauses: &TopicClauses, t: &RiskThresholds) -> Assessment {
    let availability = clauses.get(Topic::Availability);
    let sla = clauses.get(Topic::Sla);
    if availability.is_empty() && sla.is_empty() {
        return Assessment::no_clause(NO_CLAUSE);
    }

    let all: Vec<&str> = availability.iter().chain(sla).map(String::as_str).collect();
    let lowered: Vec<String> = all.iter().map(|c| c.to_lowercase()).collect();
    let mentions = |term: &str| lowered.iter().any(|c| contains_term(c, term));

    let mut findings = Vec::new();
    let mut basis = Vec::new();

    let level = match uptime(&all) {
        Some((raw, pct)) => {
            findings.push(format!("SLA includes an uptime commitment of {raw}%."));
            basis.push("the uptime commitment");
            if pct < t.uptime_medium_below_pct {
                RiskLevel::Medium
            } else {
                RiskLevel::Low
            }
        }
        None => {
            basis.push("the service level terms");
            RiskLevel::Low
        }
    };

    if mentions("availability") {
        findings.push("The agreement states a service availability / uptime commitment.".into());
    }
    if mentions("scheduled maintenance") {
        findings.push("The availability commitment references scheduled maintenance exclusions.".into());
    }
    if mentions("service credit") {
        findings.push("SLA includes service credits as the stated remedy if uptime is not met.".into());
        basis.push("the service-credit remedy");
    }
    if findings.is_empty() {
        findings.push("SLA/service levels are defined in the provided text.".into());
    }

    let mut evidence = Vec::new();
    let first_availability = availability.first();
    if let Some(clause) = first_availability {
        evidence.push(Assessment::evidence(Topic::Availability.heading(), clause));
    }
    if let Some(clause) = sla.iter().find(|c| Some(*c) != first_availability) {
        evidence.push(Assessment::evidence(Topic::Sla.heading(), clause));
    }

    Assessment {
        level,
        findings,
        evidence,
        basis,
    }
}
