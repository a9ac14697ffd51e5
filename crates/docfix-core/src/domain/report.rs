//! Run results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::plan::ManualGuidance;
use crate::backup::BackupHandle;
use crate::metrics::RunMetrics;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    StoppedByCircuitBreaker,
    StoppedByCap,
}

impl RunOutcome {
    pub fn is_stopped(self) -> bool {
        !matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::StoppedByCircuitBreaker => write!(f, "stopped_by_circuit_breaker"),
            Self::StoppedByCap => write!(f, "stopped_by_cap"),
        }
    }
}

/// Outcome of one attempted fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub fix_id: String,
    pub success: bool,
    pub error: Option<String>,
    pub elapsed_ms: u64,
    pub payload: Option<Value>,
}

impl ExecutionResult {
    pub fn succeeded(fix_id: impl Into<String>, elapsed_ms: u64, payload: Option<Value>) -> Self {
        Self {
            fix_id: fix_id.into(),
            success: true,
            error: None,
            elapsed_ms,
            payload,
        }
    }

    pub fn failed(fix_id: impl Into<String>, elapsed_ms: u64, error: impl Into<String>) -> Self {
        Self {
            fix_id: fix_id.into(),
            success: false,
            error: Some(error.into()),
            elapsed_ms,
            payload: None,
        }
    }
}

/// A fix that was deliberately not attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFix {
    pub fix_id: String,
    pub reason: String,
}

/// Loop bookkeeping captured when the run stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Fixes dispatched to a handler (declines and stale fixes excluded).
    pub attempted: usize,
    pub consecutive_failures: u32,
    /// Sum of per-fix elapsed time.
    pub total_elapsed_ms: u64,
}

/// Everything a caller learns from one `execute` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub outcome: RunOutcome,
    pub dry_run: bool,
    pub succeeded: Vec<ExecutionResult>,
    pub failed: Vec<ExecutionResult>,
    pub skipped: Vec<SkippedFix>,
    pub not_run: Vec<String>,
    pub manual_required: Vec<ManualGuidance>,
    pub backup: Option<BackupHandle>,
    pub rolled_back: bool,
    pub stats: RunStats,
    pub metrics: RunMetrics,
}

impl ExecutionReport {
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|r| r.fix_id.as_str()).collect()
    }

    pub fn succeeded_ids(&self) -> Vec<&str> {
        self.succeeded.iter().map(|r| r.fix_id.as_str()).collect()
    }
}
