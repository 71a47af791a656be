//! Deterministic hashing embedder.
//!
//! Used when no sentence model is configured or the model fails. Each token is
//! hashed with blake3 into one of `dim` buckets with a ±1 sign, and the counts
//! are L2-normalized. Stopwords and single digits are skipped so that common
//! question words and clause numbering do not dilute the signal.

use blake3::Hasher;

use clauselens_core::text::tokenize;

use crate::embedder::{TextEmbedder, normalize};

/// Default dimensionality, matching the sentence model.
pub const DEFAULT_HASH_DIM: usize = 384;

const SALT: &[u8] = b"clauselens-hash-v1:";

const STOPWORDS: &[&str] = &[
    "a", "about", "an", "and", "any", "are", "as", "at", "be", "by", "describe", "do", "does",
    "either", "explain", "for", "from", "if", "in", "is", "it", "list", "may", "of", "on", "or",
    "please", "provide", "shall", "summarise", "summarize", "that", "the", "there", "this", "to",
    "what", "will", "with",
];

fn is_stopword(token: &str) -> bool {
    STOPWORDS.binary_search(&token).is_ok()
}

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIM)
    }
}

impl HashingEmbedder {
    /// A `dim` of zero is raised to one.
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Embed one text. Text with no usable tokens maps to the zero vector.
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dim];

        for token in tokenize(text) {
            if is_stopword(&token) || (token.len() == 1 && token.as_bytes()[0].is_ascii_digit()) {
                continue;
            }
            let mut h = Hasher::new();
            h.update(SALT);
            h.update(token.as_bytes());
            let hash = h.finalize();
            let bytes = hash.as_bytes();

            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&bytes[..8]);
            let idx = (u64::from_le_bytes(bucket) % self.dim as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
            vec[idx] += sign;
        }

        normalize(&mut vec);
        vec
    }
}

impl TextEmbedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }
}
