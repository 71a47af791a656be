//! Optional rephrasing of approved answer bullets.
//!
//! A [`BulletRewriter`] may turn a clause bullet into a shorter sentence, but
//! its output is only used after [`validate_rewrite`] accepts it: one line, no
//! risk or domain vocabulary, nothing from another topic, and no number that
//! the source clause does not already contain. Anything else keeps the
//! original bullet.

use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::text::{collapse_whitespace, contains_any};

/// Longest accepted rewrite, in characters.
pub const MAX_REWRITE_CHARS: usize = 220;

const BANNED_OUTPUT_TERMS: &[&str] = &[
    "risk",
    "confidence",
    "executive",
    "overall",
    "legal",
    "compliance",
    "finance",
    "operations",
];

/// Terms a rewrite may not introduce under a given heading.
const HEADING_FORBIDDEN_TERMS: &[(&str, &[&str])] = &[
    (
        "service availability",
        &["payment", "late", "interest", "invoice", "termination", "liability", "compliance"],
    ),
    (
        "termination",
        &[
            "payment", "late", "interest", "invoice", "uptime", "availability", "sla", "liability",
            "compliance", "audit",
        ],
    ),
    ("payment terms", &["liability", "limitation of liability"]),
    ("late fees", &["liability", "limitation of liability"]),
    (
        "data protection / privacy",
        &[
            "payment", "late", "interest", "invoice", "termination", "uptime", "availability",
            "sla", "liability", "audit",
        ],
    ),
];

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+(?:\.\d+)?%?").expect("static regex"));

/// Input for one rewrite: an approved clause and where it will be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRequest {
    pub question: String,
    pub heading: String,
    pub clause: String,
}

/// Strategy that may rephrase one approved bullet.
#[async_trait]
pub trait BulletRewriter: Send + Sync {
    fn name(&self) -> &str;

    /// Return a candidate rewrite, or `None` to keep the clause as written.
    async fn rewrite(&self, request: &RewriteRequest) -> Option<String>;
}

/// Default strategy: never rewrites.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRewriter;

#[async_trait]
impl BulletRewriter for NoopRewriter {
    fn name(&self) -> &str {
        "none"
    }

    async fn rewrite(&self, _request: &RewriteRequest) -> Option<String> {
        None
    }
}

/// Numbers and percentages appearing in `text`.
pub fn numbers_in(text: &str) -> HashSet<String> {
    NUMBER
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Return the sanitised rewrite if it is safe to show, else `None`.
pub fn validate_rewrite(heading: &str, source_clause: &str, rewritten: &str) -> Option<String> {
    if rewritten.contains('\n') || rewritten.contains('\r') {
        return None;
    }
    let s = collapse_whitespace(rewritten);
    let s = s.trim_start_matches(['•', '-', '*', ' ']).trim();
    if s.is_empty() || s.chars().count() > MAX_REWRITE_CHARS {
        return None;
    }

    let low = s.to_lowercase();
    if contains_any(&low, BANNED_OUTPUT_TERMS) {
        return None;
    }

    let h = heading.trim().to_lowercase();
    let forbidden = HEADING_FORBIDDEN_TERMS
        .iter()
        .filter(|(key, _)| h.contains(key))
        .any(|(_, terms)| contains_any(&low, terms));
    if forbidden {
        return None;
    }

    let source_numbers = numbers_in(source_clause);
    if !numbers_in(s).is_subset(&source_numbers) {
        return None;
    }

    Some(s.to_string())
}

/// Ask `rewriter` for a rewrite and keep it only if it validates.
pub async fn rewrite_or_keep(rewriter: &dyn BulletRewriter, request: &RewriteRequest) -> String {
    match rewriter.rewrite(request).await {
        Some(candidate) => match validate_rewrite(&request.heading, &request.clause, &candidate) {
            Some(accepted) => accepted,
            None => {
                tracing::debug!(rewriter = rewriter.name(), "rewrite rejected by validator");
                request.clause.clone()
            }
        },
        None => request.clause.clone(),
    }
}
