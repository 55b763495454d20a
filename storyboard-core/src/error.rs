//! Error types for the enhancement engine.
//!
//! Only configuration mistakes reach the caller as hard errors. Knowledge
//! store outages and malformed script blocks are recovered where they happen
//! and reported through these types for logging and diagnostics.

use serde::Serialize;
use thiserror::Error;

/// Main error type for the enhancement engine.
#[derive(Debug, Error)]
pub enum EnhanceError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Knowledge store unavailable: {0}")]
    DataUnavailable(#[from] KnowledgeStoreError),

    #[error("Enhanced text no longer contains the original description")]
    ContentLoss,

    #[error("Enhancement pipeline panicked: {0}")]
    Panicked(String),
}

/// Invalid enhancement configuration. Always a caller error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid enhancement level '{0}' (expected low, medium or high)")]
    InvalidLevel(String),

    #[error("invalid fusion strategy '{0}' (expected annotated, natural, structured, minimal or intelligent)")]
    InvalidStrategy(String),

    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures reported by a [`KnowledgeStore`](crate::knowledge::KnowledgeStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KnowledgeStoreError {
    #[error("knowledge store unreachable: {0}")]
    Unreachable(String),

    #[error("knowledge store returned malformed data: {0}")]
    Malformed(String),
}

/// A shot block that could not be enhanced and was left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ScriptBlockError {
    #[error("shot '{shot}' has no picture description field")]
    MissingDescription { shot: String },

    #[error("shot '{shot}' has an empty picture description")]
    EmptyDescription { shot: String },

    #[error("heading '{shot}' names a shot without a shot number")]
    UnnumberedShot { shot: String },
}

impl ScriptBlockError {
    /// The heading label of the offending shot block.
    pub fn shot(&self) -> &str {
        match self {
            ScriptBlockError::MissingDescription { shot }
            | ScriptBlockError::EmptyDescription { shot }
            | ScriptBlockError::UnnumberedShot { shot } => shot,
        }
    }
}
