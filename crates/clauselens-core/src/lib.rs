//! Core types, text utilities, and shared configuration for ClauseLens.

pub mod config;
pub mod contract_id;
pub mod model;
pub mod rewrite;
pub mod text;

pub use config::{ConfigError, EngineConfig, RiskThresholds};
pub use contract_id::stable_contract_id;
pub use model::{
    AgentResult, Chunk, ConfidenceSummary, Domain, EvidenceItem, ExecutiveAnalysis, FinalResult,
    Intent, MemoryRecord, MemorySummary, ParseEnumError, QaAnswer, QaSection, RetrievalMatch,
    RiskLevel, Tone,
};
pub use rewrite::{
    BulletRewriter, NoopRewriter, RewriteRequest, numbers_in, rewrite_or_keep, validate_rewrite,
};
