//! Per-request embedding index over contract chunks.
//!
//! Built once from the contract text and then only read, so it can be shared
//! across domain scorers through an `Arc`. When a semantic embedder is in use
//! the hashing vectors are built alongside it; if the model fails at query time
//! the query is answered from the hashing vectors instead.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::{debug, info, warn};

use clauselens_core::config::EngineConfig;
use clauselens_core::model::{Chunk, RetrievalMatch};
use clauselens_core::text::{STATEMENT_TERMINATORS, chunk_text, split_sentences};

use crate::clauses::split_clause_candidates;
use crate::embedder::TextEmbedder;
use crate::hashing::HashingEmbedder;

struct SemanticVectors {
    embedder: Arc<dyn TextEmbedder>,
    vectors: Vec<Vec<f32>>,
}

pub struct EmbeddingIndex {
    chunks: Vec<Chunk>,
    semantic: Option<SemanticVectors>,
    hashing: HashingEmbedder,
    hashing_vectors: Vec<Vec<f32>>,
}

impl EmbeddingIndex {
    /// Chunk `text` and embed every chunk.
    ///
    /// A semantic embedder that errors or returns the wrong number of vectors is
    /// dropped with a warning and the index is hashing-only.
    pub fn build(
        text: &str,
        config: &EngineConfig,
        embedder: Option<Arc<dyn TextEmbedder>>,
    ) -> Self {
        let chunks = chunk_text(text, config.chunk_size, config.chunk_overlap);
        let hashing = HashingEmbedder::new(config.hash_dim);
        let hashing_vectors: Vec<Vec<f32>> = chunks.iter().map(|c| hashing.embed(&c.text)).collect();

        let semantic = match embedder {
            Some(embedder) if !chunks.is_empty() => {
                let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
                match embedder.embed_batch(&texts) {
                    Ok(vectors) if vectors.len() == chunks.len() => {
                        Some(SemanticVectors { embedder, vectors })
                    }
                    Ok(vectors) => {
                        warn!(
                            embedder = embedder.name(),
                            expected = chunks.len(),
                            got = vectors.len(),
                            "embedder returned wrong vector count, using hashing fallback"
                        );
                        None
                    }
                    Err(e) => {
                        warn!(embedder = embedder.name(), error = %e, "embedding failed, using hashing fallback");
                        None
                    }
                }
            }
            _ => None,
        };

        let index = Self {
            chunks,
            semantic,
            hashing,
            hashing_vectors,
        };
        info!(chunks = index.chunks.len(), embedder = index.embedder_name(), "built index");
        index
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Whether chunk vectors come from a semantic model.
    pub fn is_semantic(&self) -> bool {
        self.semantic.is_some()
    }

    /// Name of the embedder chunk vectors were built with.
    pub fn embedder_name(&self) -> &str {
        match &self.semantic {
            Some(s) => s.embedder.name(),
            None => "hashing",
        }
    }

    /// Embed a query with the semantic model, or `None` if unavailable or failing.
    fn semantic_query(&self, text: &str) -> Option<(Vec<f32>, &[Vec<f32>])> {
        let semantic = self.semantic.as_ref()?;
        match semantic.embedder.embed_batch(&[text]) {
            Ok(mut v) if v.len() == 1 => Some((v.swap_remove(0), semantic.vectors.as_slice())),
            Ok(_) => {
                warn!(embedder = semantic.embedder.name(), "query embedding missing, using hashing fallback");
                None
            }
            Err(e) => {
                warn!(embedder = semantic.embedder.name(), error = %e, "query embedding failed, using hashing fallback");
                None
            }
        }
    }

    /// Vector for `text` in the space the index currently answers from.
    pub fn embed_query(&self, text: &str) -> Vec<f32> {
        match self.semantic_query(text) {
            Some((v, _)) => v,
            None => self.hashing.embed(text),
        }
    }

    /// The `top_k` chunks most similar to `text`, best first.
    ///
    /// Ties keep chunk order. A `top_k` of zero is treated as one. An empty
    /// index or a blank query returns no matches.
    pub fn query(&self, text: &str, top_k: usize) -> Vec<RetrievalMatch> {
        if self.chunks.is_empty() || text.trim().is_empty() {
            return Vec::new();
        }

        let (query_vec, doc_vecs) = match self.semantic_query(text) {
            Some(found) => found,
            None => (self.hashing.embed(text), self.hashing_vectors.as_slice()),
        };

        let mut scored: Vec<(usize, f32)> = doc_vecs
            .iter()
            .enumerate()
            .map(|(i, v)| (i, dot(&query_vec, v)))
            .collect();
        // Stable sort: equal scores stay in chunk order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let matches: Vec<RetrievalMatch> = scored
            .into_iter()
            .take(top_k.max(1))
            .map(|(i, score)| RetrievalMatch {
                score,
                chunk_index: self.chunks[i].index,
                text: self.chunks[i].text.clone(),
            })
            .collect();
        debug!(
            top_k,
            best = matches.first().map(|m| m.score),
            "index query"
        );
        matches
    }

    /// Best hashing similarity between `text` and any clause of the matched
    /// chunks, or any sentence of a multi-sentence clause. Pieces without a
    /// letter (bare numbering) are not scored.
    /// Whole-chunk hashing vectors are diluted by neighbouring clauses.
    pub fn clause_score(&self, text: &str, matches: &[RetrievalMatch]) -> Option<f32> {
        if text.trim().is_empty() {
            return None;
        }
        let query_vec = self.hashing.embed(text);
        matches
            .iter()
            .flat_map(|m| split_clause_candidates(&m.text))
            .flat_map(|clause| {
                let mut units = vec![clause.clone()];
                let sentences = split_sentences(&clause, STATEMENT_TERMINATORS);
                if sentences.len() > 1 {
                    units.extend(sentences.into_iter().map(str::to_string));
                }
                units
            })
            .filter(|unit| unit.chars().any(char::is_alphabetic))
            .map(|unit| dot(&query_vec, &self.hashing.embed(&unit)))
            .reduce(f32::max)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTRACT: &str = "MASTER SERVICES AGREEMENT\n\n\
        1. Payment Terms: Customer will pay within 15 days of invoice.\n\
        2. Late Fees: Late payments accrue interest at 1.5% per month.\n\
        3. Termination: Either party may terminate for material breach with 30 days cure.\n\
        4. Liability: Liability is capped at fees paid, except for uncapped confidentiality breach.\n\
        5. SLA: Uptime commitment is 99.9%. Service credits apply if uptime falls below 99.9%.\n\
        6. Audit: Customer may audit security controls annually.";

    struct Failing;

    impl TextEmbedder for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn embed_batch(&self, _texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
            anyhow::bail!("model unavailable")
        }
    }

    /// Succeeds for chunk batches, fails for single query texts.
    struct FailsOnQuery(HashingEmbedder);

    impl TextEmbedder for FailsOnQuery {
        fn name(&self) -> &str {
            "fails-on-query"
        }

        fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
            if texts.len() == 1 && texts[0].len() < 100 {
                anyhow::bail!("query failure");
            }
            self.0.embed_batch(texts)
        }
    }

    fn small_chunks() -> EngineConfig {
        EngineConfig {
            chunk_size: 120,
            chunk_overlap: 20,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn empty_document_has_no_matches() {
        let index = EmbeddingIndex::build("", &EngineConfig::default(), None);
        assert!(index.is_empty());
        assert!(index.query("payment", 3).is_empty());
    }

    #[test]
    fn blank_query_has_no_matches() {
        let index = EmbeddingIndex::build(CONTRACT, &EngineConfig::default(), None);
        assert!(index.query("   ", 3).is_empty());
    }

    #[test]
    fn zero_top_k_returns_one() {
        let index = EmbeddingIndex::build(CONTRACT, &small_chunks(), None);
        assert_eq!(index.query("payment", 0).len(), 1);
    }

    #[test]
    fn results_sorted_descending() {
        let index = EmbeddingIndex::build(CONTRACT, &small_chunks(), None);
        let matches = index.query("uptime service credits", 10);
        assert_eq!(matches.len(), index.chunks().len());
        for pair in matches.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert!(matches[0].text.to_lowercase().contains("uptime"));
    }

    #[test]
    fn ties_keep_chunk_order() {
        let index = EmbeddingIndex::build(CONTRACT, &small_chunks(), None);
        // No usable tokens: every score is zero.
        let matches = index.query("what is the", 10);
        let order: Vec<usize> = matches.iter().map(|m| m.chunk_index).collect();
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(order, sorted);
    }

    #[test]
    fn ranking_is_deterministic() {
        let a = EmbeddingIndex::build(CONTRACT, &small_chunks(), None).query("late fees interest", 3);
        let b = EmbeddingIndex::build(CONTRACT, &small_chunks(), None).query("late fees interest", 3);
        assert_eq!(a, b);
    }

    #[test]
    fn failing_embedder_falls_back_to_hashing() {
        let index = EmbeddingIndex::build(CONTRACT, &EngineConfig::default(), Some(Arc::new(Failing)));
        assert_eq!(index.embedder_name(), "hashing");
        assert_eq!(index.query("payment terms", 3).len(), 1);
    }

    #[test]
    fn query_time_failure_uses_hashing_vectors() {
        let embedder = Arc::new(FailsOnQuery(HashingEmbedder::new(64)));
        let index = EmbeddingIndex::build(CONTRACT, &EngineConfig::default(), Some(embedder));
        assert_eq!(index.embedder_name(), "fails-on-query");
        let matches = index.query("payment terms", 3);
        assert_eq!(matches.len(), 1);
        assert!(matches[0].score > 0.0);
        assert_eq!(index.embed_query("payment").len(), EngineConfig::default().hash_dim);
    }

    #[test]
    fn clause_score_is_not_diluted_by_neighbouring_clauses() {
        let index = EmbeddingIndex::build(CONTRACT, &EngineConfig::default(), None);
        let matches = index.query("audit rights", 1);
        let clause = index.clause_score("audit rights", &matches).unwrap();
        assert!(clause > matches[0].score);
        // "6. Audit: Customer may audit security controls annually." holds
        // audit twice among six counted tokens.
        assert!((clause - 2.0 / (2.0f32.sqrt() * 8.0f32.sqrt())).abs() < 1e-4);
    }

    #[test]
    fn clause_score_scores_sentences_of_multi_sentence_clauses() {
        let index = EmbeddingIndex::build(CONTRACT, &EngineConfig::default(), None);
        let matches = index.query("uptime commitment", 1);
        let score = index.clause_score("uptime commitment", &matches).unwrap();
        let sentence = index.hashing.embed("SLA: Uptime commitment is 99.9%.");
        let q = index.hashing.embed("uptime commitment");
        assert!((score - dot(&q, &sentence)).abs() < 1e-6);
    }

    #[test]
    fn clause_score_of_blank_query_or_no_matches_is_none() {
        let index = EmbeddingIndex::build(CONTRACT, &EngineConfig::default(), None);
        let matches = index.query("payment", 3);
        assert_eq!(index.clause_score("  ", &matches), None);
        assert_eq!(index.clause_score("payment", &[]), None);
    }
}
