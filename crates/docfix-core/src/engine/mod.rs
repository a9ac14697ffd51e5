//! Bounded execution of a [`FixPlan`] against a remote host.
//!
//! The engine walks `execution_order` once, gating each fix on approval and
//! stopping on the circuit breaker or the per-run cap. It never returns an
//! error: everything that goes wrong ends up in the [`ExecutionReport`].

mod breaker;

use std::sync::Arc;

use docfix_channel::ScriptExecutor;
use tokio::time::Instant;
use tracing::{debug, warn, Instrument};

pub use breaker::CircuitBreaker;

use crate::approval::{ApprovalDecision, ApprovalHook, DeclineAll};
use crate::backup::{BackupCoordinator, BackupHandle, BackupStore};
use crate::domain::{
    ExecutionReport, ExecutionResult, Fix, FixPlan, FixStatus, RunOutcome, RunStats, SkippedFix,
};
use crate::drafting::{TemplateDrafter, TextDrafter};
use crate::handlers::HandlerTable;
use crate::metrics::{MetricsAggregator, RunMetrics};
use crate::obs;
use crate::policy::{RunPolicy, CIRCUIT_BREAKER_THRESHOLD};

/// Lifecycle of a single `execute` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    BackingUp,
    Running,
    StoppedByCircuitBreaker,
    StoppedByCap,
    Completed,
    Finalizing,
    Done,
}

impl From<RunOutcome> for RunState {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Completed => Self::Completed,
            RunOutcome::StoppedByCircuitBreaker => Self::StoppedByCircuitBreaker,
            RunOutcome::StoppedByCap => Self::StoppedByCap,
        }
    }
}

fn transition(state: &mut RunState, next: RunState) {
    debug!(from = ?state, to = ?next, "run state");
    *state = next;
}

/// Mutable bookkeeping for one run.
struct RunLedger {
    breaker: CircuitBreaker,
    attempted: usize,
    succeeded: Vec<ExecutionResult>,
    failed: Vec<ExecutionResult>,
    skipped: Vec<SkippedFix>,
    not_run: Vec<String>,
}

impl RunLedger {
    fn new() -> Self {
        Self {
            breaker: CircuitBreaker::new(CIRCUIT_BREAKER_THRESHOLD),
            attempted: 0,
            succeeded: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            not_run: Vec::new(),
        }
    }

    fn skip(&mut self, fix_id: &str, reason: String) {
        obs::emit_fix_skipped(fix_id, &reason);
        self.skipped.push(SkippedFix {
            fix_id: fix_id.to_string(),
            reason,
        });
    }

    fn stop_reason(&self, policy: &RunPolicy) -> Option<RunOutcome> {
        if self.breaker.is_open() {
            Some(RunOutcome::StoppedByCircuitBreaker)
        } else if self.attempted >= policy.max_fixes_per_run {
            Some(RunOutcome::StoppedByCap)
        } else {
            None
        }
    }
}

/// Move a fix to `next`, logging (never applying) an illegal transition.
fn set_status(plan: &mut FixPlan, fix_id: &str, next: FixStatus) {
    match plan.fix_mut(fix_id) {
        Some(fix) => {
            if let Err(e) = fix.advance(next) {
                warn!(error = %e, "status transition rejected");
            }
        }
        None => warn!(fix_id = %fix_id, "fix vanished from plan"),
    }
}

/// Executes plans. Holds shared handles to its collaborators so several
/// engines (and runs) can coexist in one process.
pub struct ExecutionEngine {
    executor: Arc<dyn ScriptExecutor>,
    approval: Arc<dyn ApprovalHook>,
    drafter: Arc<dyn TextDrafter>,
    backup: Option<BackupCoordinator>,
    handlers: HandlerTable,
}

impl ExecutionEngine {
    /// Engine with no backup store, the template drafter, and an approval
    /// hook that declines everything.
    pub fn new(executor: Arc<dyn ScriptExecutor>) -> Self {
        Self {
            executor,
            approval: Arc::new(DeclineAll),
            drafter: Arc::new(TemplateDrafter),
            backup: None,
            handlers: HandlerTable::new(),
        }
    }

    pub fn with_approval(mut self, approval: Arc<dyn ApprovalHook>) -> Self {
        self.approval = approval;
        self
    }

    pub fn with_drafter(mut self, drafter: Arc<dyn TextDrafter>) -> Self {
        self.drafter = drafter;
        self
    }

    pub fn with_backup(mut self, store: Arc<dyn BackupStore>) -> Self {
        self.backup = Some(BackupCoordinator::new(store));
        self
    }

    pub fn with_handlers(mut self, handlers: HandlerTable) -> Self {
        self.handlers = handlers;
        self
    }

    /// Execute `plan` under `policy`. Fix statuses in `plan` are updated in
    /// place unless the run is a dry run.
    pub async fn execute(&self, plan: &mut FixPlan, policy: &RunPolicy) -> ExecutionReport {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = obs::run_span(&run_id, policy.dry_run);
        self.run(plan, policy).instrument(span).await
    }

    async fn run(&self, plan: &mut FixPlan, policy: &RunPolicy) -> ExecutionReport {
        let mut state = RunState::NotStarted;
        obs::emit_run_started(
            plan.automated_fixes.len(),
            plan.manual_fixes.len(),
            policy.max_fixes_per_run,
        );

        let backup = self.take_backup(policy, &mut state).await;
        transition(&mut state, RunState::Running);

        let mut ledger = RunLedger::new();
        let mut outcome = RunOutcome::Completed;
        let order = plan.execution_order.clone();

        for (idx, fix_id) in order.iter().enumerate() {
            let fix = match plan.fix(fix_id) {
                Some(fix) => fix.clone(),
                None => {
                    warn!(fix_id = %fix_id, "execution order references unknown fix");
                    continue;
                }
            };

            if fix.status != FixStatus::Pending {
                ledger.skip(&fix.id, format!("already {}", fix.status));
                continue;
            }

            if let Some(stop) = ledger.stop_reason(policy) {
                outcome = stop;
                self.drain_remaining(plan, &order[idx..], &mut ledger);
                obs::emit_run_stopped(stop, ledger.attempted, ledger.not_run.len());
                break;
            }

            if policy.dry_run {
                ledger.attempted += 1;
                ledger.breaker.record_success();
                ledger.succeeded.push(ExecutionResult::succeeded(&fix.id, 0, None));
                continue;
            }

            if policy.require_approval && fix.risk.requires_approval() {
                if let ApprovalDecision::Decline { reason } = self.approval.approve(&fix).await {
                    set_status(plan, &fix.id, FixStatus::Skipped);
                    ledger.skip(&fix.id, reason);
                    continue;
                }
            }

            set_status(plan, &fix.id, FixStatus::Approved);
            let result = self.apply_fix(&fix, &mut ledger).await;
            set_status(
                plan,
                &fix.id,
                if result.success {
                    FixStatus::Succeeded
                } else {
                    FixStatus::Failed
                },
            );
            if result.success {
                ledger.succeeded.push(result);
            } else {
                ledger.failed.push(result);
            }
        }

        // A trip on the last fix in the order never reaches the pre-fix check.
        if outcome == RunOutcome::Completed && ledger.breaker.is_open() {
            outcome = RunOutcome::StoppedByCircuitBreaker;
            obs::emit_run_stopped(outcome, ledger.attempted, 0);
        }

        transition(&mut state, outcome.into());

        let rolled_back = match (&backup, &self.backup) {
            (Some(handle), Some(coordinator))
                if outcome == RunOutcome::StoppedByCircuitBreaker && policy.rollback_on_failure =>
            {
                coordinator.rollback(handle).await
            }
            _ => false,
        };

        transition(&mut state, RunState::Finalizing);
        let report = Self::finalize(plan, policy, outcome, ledger, backup, rolled_back);
        transition(&mut state, RunState::Done);
        obs::emit_run_finished(&report);
        report
    }

    async fn take_backup(&self, policy: &RunPolicy, state: &mut RunState) -> Option<BackupHandle> {
        let coordinator = self.backup.as_ref()?;
        if policy.dry_run || !policy.rollback_on_failure {
            return None;
        }
        transition(state, RunState::BackingUp);
        coordinator.begin(policy).await
    }

    /// Dispatch one approved fix and update the breaker.
    async fn apply_fix(&self, fix: &Fix, ledger: &mut RunLedger) -> ExecutionResult {
        ledger.attempted += 1;
        let started = Instant::now();
        let outcome = self
            .handlers
            .apply(fix, self.executor.as_ref(), self.drafter.as_ref())
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(payload) => {
                ledger.breaker.record_success();
                obs::emit_fix_applied(&fix.id, fix.kind.as_str(), elapsed_ms);
                ExecutionResult::succeeded(&fix.id, elapsed_ms, Some(payload))
            }
            Err(e) => {
                let streak = ledger.breaker.record_failure();
                obs::emit_fix_failed(&fix.id, fix.kind.as_str(), &e, streak);
                ExecutionResult::failed(&fix.id, elapsed_ms, e.to_string())
            }
        }
    }

    /// Account for every fix left in the order after a stop.
    fn drain_remaining(&self, plan: &FixPlan, remaining: &[String], ledger: &mut RunLedger) {
        for fix_id in remaining {
            match plan.fix(fix_id) {
                Some(fix) if fix.status == FixStatus::Pending => {
                    ledger.not_run.push(fix_id.clone());
                }
                Some(fix) => {
                    let reason = format!("already {}", fix.status);
                    ledger.skip(fix_id, reason);
                }
                None => warn!(fix_id = %fix_id, "execution order references unknown fix"),
            }
        }
    }

    fn finalize(
        plan: &FixPlan,
        policy: &RunPolicy,
        outcome: RunOutcome,
        ledger: RunLedger,
        backup: Option<BackupHandle>,
        rolled_back: bool,
    ) -> ExecutionReport {
        let total_elapsed_ms = ledger
            .succeeded
            .iter()
            .chain(&ledger.failed)
            .map(|r| r.elapsed_ms)
            .sum();

        let mut report = ExecutionReport {
            outcome,
            dry_run: policy.dry_run,
            succeeded: ledger.succeeded,
            failed: ledger.failed,
            skipped: ledger.skipped,
            not_run: ledger.not_run,
            manual_required: plan.manual_fixes.clone(),
            backup,
            rolled_back,
            stats: RunStats {
                attempted: ledger.attempted,
                consecutive_failures: ledger.breaker.failure_count(),
                total_elapsed_ms,
            },
            metrics: RunMetrics::default(),
        };
        report.metrics = MetricsAggregator::compute(plan, &report);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::AutoApprove;
    use crate::domain::{FixStrategy, RiskLevel, Severity, Violation};
    use crate::fakes::ScriptedHost;
    use crate::planner::FixPlanSynthesizer;
    use serde_json::json;

    fn color(id: &str, risk: RiskLevel) -> Violation {
        Violation::new("color", Severity::Major, true)
            .with_id(id)
            .with_strategy(
                FixStrategy::new("color")
                    .with_param("to", json!("#00393F"))
                    .with_risk(risk),
            )
    }

    #[test]
    fn test_run_state_from_outcome() {
        assert_eq!(
            RunState::from(RunOutcome::StoppedByCap),
            RunState::StoppedByCap
        );
        assert_eq!(RunState::from(RunOutcome::Completed), RunState::Completed);
    }

    #[tokio::test]
    async fn test_statuses_advance_on_success_and_failure() {
        let mut plan = FixPlanSynthesizer::default()
            .synthesize(&[color("a", RiskLevel::Low), color("b", RiskLevel::Low)])
            .await;
        let host = Arc::new(ScriptedHost::new());
        host.push_ok(json!({"success": true}));
        host.push_ok(json!({"success": false, "error": "locked layer"}));

        let engine = ExecutionEngine::new(host.clone());
        let report = engine.execute(&mut plan, &RunPolicy::default()).await;

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(plan.automated_fixes[0].status, FixStatus::Succeeded);
        assert_eq!(plan.automated_fixes[1].status, FixStatus::Failed);
        assert_eq!(report.failed[0].error.as_deref(), Some("host reported failure: locked layer"));
        assert_eq!(report.stats.consecutive_failures, 1);
        assert_eq!(report.stats.attempted, 2);
    }

    #[tokio::test]
    async fn test_rerun_reports_stale_fixes() {
        let mut plan = FixPlanSynthesizer::default()
            .synthesize(&[color("a", RiskLevel::Low)])
            .await;
        let host = Arc::new(ScriptedHost::new());
        host.push_ok(json!({"success": true}));
        let engine = ExecutionEngine::new(host.clone()).with_approval(Arc::new(AutoApprove));

        engine.execute(&mut plan, &RunPolicy::default()).await;
        let second = engine.execute(&mut plan, &RunPolicy::default()).await;

        assert_eq!(host.call_count(), 1);
        assert_eq!(second.skipped.len(), 1);
        assert_eq!(second.skipped[0].reason, "already succeeded");
        assert_eq!(second.stats.attempted, 0);
    }

    #[tokio::test]
    async fn test_missing_fix_in_order_is_ignored() {
        let mut plan = FixPlanSynthesizer::default()
            .synthesize(&[color("a", RiskLevel::Low)])
            .await;
        plan.execution_order.insert(0, "fix-404".into());
        let host = Arc::new(ScriptedHost::new());
        host.push_ok(json!({"success": true}));

        let report = ExecutionEngine::new(host)
            .execute(&mut plan, &RunPolicy::default())
            .await;
        assert_eq!(report.succeeded.len(), 1);
        assert!(report.skipped.is_empty());
        assert_eq!(report.stats.attempted, 1);
    }

    #[tokio::test]
    async fn test_no_approval_needed_when_policy_says_so() {
        let mut plan = FixPlanSynthesizer::default()
            .synthesize(&[color("a", RiskLevel::High)])
            .await;
        let host = Arc::new(ScriptedHost::new());
        host.push_ok(json!({"success": true}));

        let report = ExecutionEngine::new(host)
            .execute(&mut plan, &RunPolicy::unattended())
            .await;
        assert_eq!(report.succeeded.len(), 1);
        assert!(report.skipped.is_empty());
    }
}
