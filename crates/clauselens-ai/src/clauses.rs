//! Clause splitting and normalization.
//!
//! Contract text is cut at numbered headings ("1. Payment Terms: ...") when it
//! has them and at sentence boundaries otherwise. Each candidate loses its
//! numbering and a recognised section heading, then breaks into atomic
//! statements. Every statement produced here is a substring of the
//! whitespace-collapsed input.

use std::sync::LazyLock;

use regex::Regex;

use clauselens_core::text::{STATEMENT_TERMINATORS, collapse_whitespace, split_sentences};

static NUMBERED_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+\.\s+[A-Z]").expect("static regex"));

static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s+").expect("static regex"));

// Longer alternatives first: the regex engine takes the leftmost-first match.
static SECTION_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:payment terms|late fees\s*/\s*interest|late fees|termination|limitation of liability|service levels\s*\(sla\)|service levels|service availability|sla|liability|audit rights|audit|privacy|data protection)",
    )
    .expect("static regex")
});

/// Split text into clause candidates.
pub fn split_clause_candidates(text: &str) -> Vec<String> {
    let text = collapse_whitespace(text);
    let starts: Vec<usize> = NUMBERED_HEADING.find_iter(&text).map(|m| m.start()).collect();

    if starts.is_empty() {
        return split_sentences(&text, STATEMENT_TERMINATORS)
            .into_iter()
            .map(str::to_string)
            .collect();
    }

    let mut bounds = Vec::with_capacity(starts.len() + 2);
    bounds.push(0);
    bounds.extend(starts.iter().copied().filter(|&s| s > 0));
    bounds.push(text.len());

    bounds
        .windows(2)
        .map(|w| text[w[0]..w[1]].trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Strip leading numbering and a known section heading.
///
/// A heading is removed only when a separator (`:`, `/`, `-`) or an upper-case
/// word follows it, so "Liability is capped" keeps its subject.
pub fn normalize_clause(clause: &str) -> String {
    let s = collapse_whitespace(clause);
    let mut rest = s.as_str();

    if let Some(m) = LEADING_NUMBER.find(rest) {
        rest = &rest[m.end()..];
    }

    if let Some(m) = SECTION_HEADING.find(rest) {
        let after = &rest[m.end()..];
        let trimmed = after.trim_start();
        if let Some(stripped) = trimmed.strip_prefix([':', '/', '-']) {
            rest = stripped.trim_start();
        } else if after.starts_with(' ') && trimmed.starts_with(|c: char| c.is_uppercase()) {
            rest = trimmed;
        }
    }

    rest.trim().to_string()
}

/// Break a clause into normalized sentences. Pieces without a letter are dropped.
pub fn atomic_statements(clause: &str) -> Vec<String> {
    split_sentences(clause, STATEMENT_TERMINATORS)
        .into_iter()
        .map(normalize_clause)
        .filter(|s| s.chars().any(char::is_alphabetic))
        .collect()
}

/// All atomic statements of `text`, in document order.
pub fn statements(text: &str) -> Vec<String> {
    split_clause_candidates(text)
        .iter()
        .map(|c| normalize_clause(c))
        .filter(|c| !c.is_empty())
        .flat_map(|c| atomic_statements(&c))
        .collect()
}
