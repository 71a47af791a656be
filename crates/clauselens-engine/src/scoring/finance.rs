//! Finance: payment timing and late-fee terms.

use std::sync::LazyLock;

use regex::Regex;

use clauselens_ai::Topic;
use clauselens_core::config::RiskThresholds;
use clauselens_core::model::RiskLevel;
use clauselens_core::text::{contains_any, contains_term};

use super::{Assessment, TopicClauses, first_day_count, worst_statement};

const NO_CLAUSE: &str =
    "No relevant clause identified for payment terms or late fees in the provided text.";

static MONTHLY_RATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*%.*\b(?:per month|monthly)\b").expect("static regex")
});

fn payment_signal(clause: &str, t: &RiskThresholds) -> (RiskLevel, String) {
    let low = clause.to_lowercase();
    let days = first_day_count(clause);
    let of_invoice = if contains_term(&low, "invoic") { " of invoice" } else { "" };

    if low.contains("upon receipt") {
        return (RiskLevel::High, "Payment Terms require payment upon receipt.".into());
    }
    if contains_term(&low, "immediately") {
        return (RiskLevel::High, "Payment Terms require payment immediately.".into());
    }

    match days {
        Some(d) => {
            let level = if d <= t.payment_medium_max_days {
                RiskLevel::Medium
            } else {
                RiskLevel::Low
            };
            (level, format!("Payment Terms require payment within {d} days{of_invoice}."))
        }
        None => (
            RiskLevel::Low,
            "Payment Terms specify a payment timing obligation tied to invoicing.".into(),
        ),
    }
}

fn late_fee_signal(clause: &str, t: &RiskThresholds) -> (RiskLevel, String) {
    let low = clause.to_lowercase();
    let rate = MONTHLY_RATE
        .captures(clause)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let pct: Option<f32> = rate.as_deref().and_then(|r| r.parse().ok());

    let level = if contains_any(&low, &["liquidated damages", "penalty", "punitive"]) {
        RiskLevel::High
    } else if pct.is_some_and(|p| p >= t.interest_high_pct) {
        RiskLevel::High
    } else if pct.is_some_and(|p| p >= t.interest_medium_pct) {
        RiskLevel::Medium
    } else if pct.is_none()
        && contains_term(&low, "interest")
        && contains_any(&low, &["per month", "monthly", "%"])
    {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    let finding = match rate {
        Some(r) => format!("Late Fees accrue interest at {r}% per month (as written in the late-fee clause)."),
        None => "Late Fees include an interest/charge provision for overdue amounts.".into(),
    };
    (level, finding)
}

pub fn assess(clauses: &TopicClauses, t: &RiskThresholds) -> Assessment {
    let payment = worst_statement(clauses, Topic::Payment, |c| payment_signal(c, t));
    let late = worst_statement(clauses, Topic::LateFees, |c| late_fee_signal(c, t));
    if payment.is_none() && late.is_none() {
        return Assessment::no_clause(NO_CLAUSE);
    }

    let mut levels = Vec::new();
    let mut findings = Vec::new();
    let mut evidence = Vec::new();
    let mut basis = Vec::new();

    if let Some((clause, level, finding)) = payment {
        levels.push(level);
        findings.push(finding);
        evidence.push(Assessment::evidence(Topic::Payment.heading(), clause));
        basis.push("the payment timing");
    }
    if let Some((clause, level, finding)) = late {
        levels.push(level);
        findings.push(finding);
        evidence.push(Assessment::evidence(Topic::LateFees.heading(), clause));
        basis.push("the late-fee structure");
    }

    Assessment {
        level: RiskLevel::max_of(levels),
        findings,
        evidence,
        basis,
    }
}
