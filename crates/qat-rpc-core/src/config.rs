//! Compiler configuration carried alongside a program.
//!
//! The receiver only interprets the handful of fields the execution engine
//! needs; everything else is kept in `extra` so the blob round-trips intact.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, RpcError};

/// Default shot count when a config omits `repeats`.
pub const DEFAULT_REPEATS: u32 = 1000;

/// How measurement results are shaped in a reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultsFormat {
    /// One bitstring per shot.
    #[default]
    Raw,
    /// Histogram of bitstring -> count.
    BinaryCount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    #[serde(default = "default_repeats")]
    pub repeats: u32,

    #[serde(default)]
    pub results_format: ResultsFormat,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_repeats() -> u32 {
    DEFAULT_REPEATS
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            repeats: DEFAULT_REPEATS,
            results_format: ResultsFormat::default(),
            extra: Map::new(),
        }
    }
}

impl CompilerConfig {
    /// Parse a serialized config. Any malformed blob is a validation error.
    pub fn from_json(s: &str) -> Result<Self> {
        let cfg: CompilerConfig = serde_json::from_str(s)
            .map_err(|e| RpcError::Validation(format!("invalid compiler config: {e}")))?;
        if cfg.repeats == 0 {
            return Err(RpcError::Validation("compiler config repeats must be > 0".into()));
        }
        Ok(cfg)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| RpcError::Internal(format!("serialize compiler config: {e}")))
    }

    pub fn with_repeats(mut self, repeats: u32) -> Self {
        self.repeats = repeats;
        self
    }

    pub fn binary_count(mut self) -> Self {
        self.results_format = ResultsFormat::BinaryCount;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let cfg = CompilerConfig::from_json("{}").expect("parse");
        assert_eq!(cfg, CompilerConfig::default());
    }

    #[test]
    fn unknown_keys_are_preserved() {
        let cfg = CompilerConfig::from_json(
            r#"{"repeats": 10, "results_format": "binary_count", "optimizations": {"level": 2}}"#,
        )
        .expect("parse");
        assert_eq!(cfg.repeats, 10);
        assert_eq!(cfg.results_format, ResultsFormat::BinaryCount);

        let again = CompilerConfig::from_json(&cfg.to_json().expect("serialize")).expect("parse");
        assert_eq!(again.extra["optimizations"]["level"], 2);
    }

    #[test]
    fn malformed_blobs_are_validation_errors() {
        for bad in ["not json", "[1,2]", r#"{"repeats": -1}"#, r#"{"repeats": 0}"#] {
            let err = CompilerConfig::from_json(bad).expect_err(bad);
            assert_eq!(err.kind(), crate::ErrorKind::Validation, "{bad}");
        }
    }
}
