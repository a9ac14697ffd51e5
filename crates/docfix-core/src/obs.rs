//! Structured run-lifecycle events.
//!
//! Every run gets a `docfix.run` span carrying its `run_id`; the engine
//! instruments its future with it so events below inherit the id.

use tracing::{info, warn, Span};

use crate::domain::{ExecutionReport, RunOutcome};

/// Span for one engine run. Attach with `Instrument::instrument`.
pub fn run_span(run_id: &str, dry_run: bool) -> Span {
    tracing::info_span!("docfix.run", run_id = %run_id, dry_run = dry_run)
}

pub fn emit_run_started(fixes: usize, manual: usize, max_fixes: usize) {
    info!(
        event = "run.started",
        fixes = fixes,
        manual = manual,
        max_fixes = max_fixes,
    );
}

pub fn emit_fix_applied(fix_id: &str, kind: &str, elapsed_ms: u64) {
    info!(event = "fix.applied", fix_id = %fix_id, kind = %kind, elapsed_ms = elapsed_ms);
}

pub fn emit_fix_failed(fix_id: &str, kind: &str, error: &dyn std::fmt::Display, consecutive: u32) {
    warn!(
        event = "fix.failed",
        fix_id = %fix_id,
        kind = %kind,
        error = %error,
        consecutive_failures = consecutive,
    );
}

pub fn emit_fix_skipped(fix_id: &str, reason: &str) {
    info!(event = "fix.skipped", fix_id = %fix_id, reason = %reason);
}

pub fn emit_run_stopped(outcome: RunOutcome, attempted: usize, remaining: usize) {
    warn!(
        event = "run.stopped",
        outcome = %outcome,
        attempted = attempted,
        remaining = remaining,
    );
}

pub fn emit_run_finished(report: &ExecutionReport) {
    info!(
        event = "run.finished",
        outcome = %report.outcome,
        succeeded = report.metrics.succeeded,
        failed = report.metrics.failed,
        skipped = report.metrics.skipped,
        not_run = report.metrics.not_run,
        manual = report.metrics.manual_required,
        success_rate = report.metrics.success_rate,
        rolled_back = report.rolled_back,
    );
}

pub fn emit_backup_failed(stage: &str, error: &dyn std::fmt::Display) {
    warn!(event = "backup.failed", stage = %stage, error = %error);
}
