//! Engine configuration.
//!
//! All knobs have defaults matching the documented business rules; a TOML file
//! may override any subset of them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Heuristic thresholds used by the domain risk scorers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    /// Payment due within this many days (or fewer) is `medium`; longer
    /// terms are `low`.
    pub payment_medium_max_days: u32,
    /// Monthly late interest at or above this percentage is `high`.
    pub interest_high_pct: f32,
    /// Monthly late interest at or above this percentage is `medium`.
    pub interest_medium_pct: f32,
    /// A cure period shorter than this many days is `high`.
    pub cure_high_below_days: u32,
    /// A cure period shorter than this many days is `medium`.
    pub cure_medium_below_days: u32,
    /// An uptime commitment below this percentage is `medium`.
    pub uptime_medium_below_pct: f32,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            payment_medium_max_days: 15,
            interest_high_pct: 2.0,
            interest_medium_pct: 1.0,
            cure_high_below_days: 10,
            cure_medium_below_days: 30,
            uptime_medium_below_pct: 99.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Characters shared between neighbouring chunks.
    pub chunk_overlap: usize,
    /// Chunks retrieved by the evidence probe.
    pub probe_top_k: usize,
    /// Chunks retrieved per topic query inside a domain scorer.
    pub topic_top_k: usize,
    /// Default probe score below which factual questions are refused.
    pub no_evidence_threshold: f32,
    /// Dimensionality of the hashing fallback embedder.
    pub hash_dim: usize,
    /// Directory for per-contract memory logs. `None` disables memory.
    pub memory_dir: Option<PathBuf>,
    pub thresholds: RiskThresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 900,
            chunk_overlap: 120,
            probe_top_k: 3,
            topic_top_k: 6,
            no_evidence_threshold: 0.25,
            hash_dim: 384,
            memory_dir: None,
            thresholds: RiskThresholds::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load a TOML config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_toml_keeps_defaults() {
        let cfg = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn partial_thresholds_override() {
        let cfg = EngineConfig::from_toml_str(
            r#"
            chunk_size = 400
            [thresholds]
            interest_high_pct = 3.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.chunk_size, 400);
        assert_eq!(cfg.chunk_overlap, 120);
        assert_eq!(cfg.thresholds.interest_high_pct, 3.0);
        assert_eq!(cfg.thresholds.payment_medium_max_days, 15);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "memory_dir = \"/tmp/clauselens\"").unwrap();
        let cfg = EngineConfig::load(file.path()).unwrap();
        assert_eq!(cfg.memory_dir, Some(PathBuf::from("/tmp/clauselens")));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = EngineConfig::load(Path::new("/nonexistent/clauselens.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn bad_toml_is_parse_error() {
        let err = EngineConfig::from_toml_str("chunk_size = \"big\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
