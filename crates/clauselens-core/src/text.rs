//! Text normalisation, chunking, and keyword matching helpers.
//!
//! Keyword rules throughout the engine go through [`contains_term`], which
//! matches a term only at the start of a word: `due` matches "due" and
//! "dues" but never "overdue", and `pay` matches "payment". Terms starting with
//! punctuation (such as `%`) match anywhere.

use crate::model::Chunk;

/// Sentence terminators used when splitting clauses into atomic statements.
pub const STATEMENT_TERMINATORS: &[char] = &['.', '!', '?', ';'];

/// Terminators for evidence sanitisation, where `;` keeps a clause together.
pub const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?'];

/// Collapse every run of whitespace into a single space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split normalized text into overlapping windows of `size` characters.
///
/// Windows advance by `size - overlap` characters (at least one). A `size` of
/// zero yields the whole text as one chunk; empty text yields no chunks.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<Chunk> {
    let normalized = collapse_whitespace(text);
    if normalized.is_empty() {
        return Vec::new();
    }
    if size == 0 {
        return vec![Chunk {
            index: 0,
            text: normalized,
        }];
    }

    let chars: Vec<char> = normalized.chars().collect();
    let step = size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + size).min(chars.len());
        chunks.push(Chunk {
            index: chunks.len(),
            text: chars[start..end].iter().collect(),
        });
        if end >= chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

/// Split after any terminator that is followed by whitespace.
///
/// Pieces are trimmed; empty pieces are dropped. Decimal points ("1.5%") do not
/// split because no whitespace follows them.
pub fn split_sentences<'a>(text: &'a str, terminators: &[char]) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;

    for (i, c) in text.char_indices() {
        if c.is_whitespace() && prev.is_some_and(|p| terminators.contains(&p)) {
            let piece = text[start..i].trim();
            if !piece.is_empty() {
                out.push(piece);
            }
            start = i;
        }
        prev = Some(c);
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

/// Word-start keyword match. Both arguments are expected in lower case.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    let Some(first) = term.chars().next() else {
        return false;
    };
    if !first.is_alphanumeric() {
        return haystack.contains(term);
    }
    haystack.match_indices(term).any(|(i, _)| {
        haystack[..i]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric())
    })
}

/// True when any of `terms` matches `haystack` (see [`contains_term`]).
pub fn contains_any(haystack: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| contains_term(haystack, t))
}

/// The terms from `terms` that match `haystack`.
pub fn matching_terms<'t>(haystack: &str, terms: &[&'t str]) -> Vec<&'t str> {
    terms
        .iter()
        .copied()
        .filter(|t| contains_term(haystack, t))
        .collect()
}

/// Lower-case ASCII alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
        .collect()
}

/// Truncate to at most `max` characters on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
