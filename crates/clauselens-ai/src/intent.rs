//! Question intent classification.
//!
//! An ordered rule table: the first rule whose predicate holds decides the
//! intent, and anything unmatched is a fact summary. `executive_review` has no
//! rule and is only reachable through an explicit override.

use clauselens_core::model::Intent;
use clauselens_core::text::{contains_any, contains_term, tokenize};
use tracing::debug;

struct IntentRule {
    intent: Intent,
    matches: fn(&str) -> bool,
}

const RULES: &[IntentRule] = &[
    IntentRule {
        intent: Intent::RiskAnalysis,
        matches: asks_for_risk,
    },
    IntentRule {
        intent: Intent::FactSummary,
        matches: opens_with_summary_verb,
    },
    IntentRule {
        intent: Intent::ClauseExtraction,
        matches: asks_for_clause_text,
    },
    IntentRule {
        intent: Intent::Qa,
        matches: opens_with_wh_word,
    },
];

const SUMMARY_OPENERS: &[&str] = &["explain", "summarize", "summarise", "what", "describe", "list"];
const WH_OPENERS: &[&str] = &["when", "who", "where", "why", "how"];
const NON_RISK_ANALYSIS: &[&str] = &["data analysis", "statistical analysis"];

fn first_word(q: &str) -> Option<String> {
    tokenize(q).into_iter().next()
}

fn asks_for_risk(q: &str) -> bool {
    if contains_any(q, &["risk", "red flag"]) {
        return true;
    }
    contains_term(q, "analysis") && !contains_any(q, NON_RISK_ANALYSIS)
}

fn opens_with_summary_verb(q: &str) -> bool {
    first_word(q).is_some_and(|w| SUMMARY_OPENERS.contains(&w.as_str()))
}

fn asks_for_clause_text(q: &str) -> bool {
    contains_any(q, &["extract", "clause", "section", "quote"])
}

fn opens_with_wh_word(q: &str) -> bool {
    first_word(q).is_some_and(|w| WH_OPENERS.contains(&w.as_str()))
}

/// Classify a question by the first matching rule.
pub fn classify_intent(question: &str) -> Intent {
    let q = question.trim().to_lowercase();
    RULES
        .iter()
        .find(|rule| (rule.matches)(&q))
        .map(|rule| rule.intent)
        .unwrap_or(Intent::FactSummary)
}

/// Use `override_intent` when it names a known intent, else classify.
pub fn resolve_intent(question: &str, override_intent: Option<&str>) -> Intent {
    if let Some(raw) = override_intent.filter(|s| !s.trim().is_empty()) {
        match raw.parse::<Intent>() {
            Ok(intent) => return intent,
            Err(e) => debug!(error = %e, "ignoring intent override"),
        }
    }
    classify_intent(question)
}
