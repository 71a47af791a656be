//! Retrieval and classification for contract questions.
//!
//! The embedding index ranks chunks against a query, using a sentence model
//! when one is available (`onnx` feature) and a deterministic hashing embedder
//! otherwise. Intent and topic resolution are ordered keyword rule tables.

pub mod clauses;
pub mod embedder;
pub mod hashing;
pub mod index;
pub mod intent;
pub mod topics;

#[cfg(feature = "onnx")]
pub use embedder::OnnxEmbedder;
pub use embedder::{TextEmbedder, cosine_similarity};
pub use hashing::HashingEmbedder;
pub use index::EmbeddingIndex;
pub use intent::{classify_intent, resolve_intent};
pub use topics::{Topic, extract_topic_statements, mentioned_topics, requested_topics};
