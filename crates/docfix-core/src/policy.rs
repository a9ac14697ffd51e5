//! Run policy knobs.

use serde::{Deserialize, Serialize};

/// Consecutive failures that stop a run.
pub const CIRCUIT_BREAKER_THRESHOLD: u32 = 3;

pub const DEFAULT_MAX_FIXES_PER_RUN: usize = 50;

/// Per-run configuration for the execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunPolicy {
    /// Route non-low-risk fixes through the approval hook.
    pub require_approval: bool,
    pub max_fixes_per_run: usize,
    /// Back up before running and restore when the circuit breaker trips.
    pub rollback_on_failure: bool,
    pub dry_run: bool,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            require_approval: true,
            max_fixes_per_run: DEFAULT_MAX_FIXES_PER_RUN,
            rollback_on_failure: true,
            dry_run: false,
        }
    }
}

impl RunPolicy {
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    pub fn unattended() -> Self {
        Self {
            require_approval: false,
            ..Self::default()
        }
    }

    pub fn with_max_fixes(mut self, max: usize) -> Self {
        self.max_fixes_per_run = max;
        self
    }

    pub fn with_rollback(mut self, enabled: bool) -> Self {
        self.rollback_on_failure = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = RunPolicy::default();
        assert!(p.require_approval);
        assert_eq!(p.max_fixes_per_run, 50);
        assert!(p.rollback_on_failure);
        assert!(!p.dry_run);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let p: RunPolicy = serde_json::from_str(r#"{"dry_run": true}"#).unwrap();
        assert!(p.dry_run);
        assert!(p.require_approval);
        assert_eq!(p.max_fixes_per_run, DEFAULT_MAX_FIXES_PER_RUN);
    }
}
