//! Domain-level error taxonomy for docfix.

use super::fix::FixStatus;

/// docfix domain errors.
#[derive(Debug, thiserror::Error)]
pub enum DocfixError {
    #[error("invalid status transition for {fix_id}: {from} -> {to}")]
    InvalidTransition {
        fix_id: String,
        from: FixStatus,
        to: FixStatus,
    },

    #[error("fix not found in plan: {0}")]
    FixNotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for docfix domain operations.
pub type Result<T> = std::result::Result<T, DocfixError>;
