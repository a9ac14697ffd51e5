//! Run metrics derived from final report counts.

use serde::{Deserialize, Serialize};

use crate::domain::{ExecutionReport, FixPlan};

/// Summary numbers for one run. Pure function of the plan and report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub not_run: usize,
    pub manual_required: usize,
    /// succeeded / attempted; 0.0 when nothing was attempted.
    pub success_rate: f64,
    /// automated / (automated + manual); 0.0 for an empty plan.
    pub automation_rate: f64,
    /// Estimated seconds of human work replaced by succeeded fixes.
    pub time_saved_seconds: u64,
}

pub struct MetricsAggregator;

impl MetricsAggregator {
    pub fn compute(plan: &FixPlan, report: &ExecutionReport) -> RunMetrics {
        let attempted = report.stats.attempted;
        let succeeded = report.succeeded.len();

        let automated = plan.automated_fixes.len();
        let manual = plan.manual_fixes.len();

        let time_saved_seconds = report
            .succeeded
            .iter()
            .filter_map(|r| plan.fix(&r.fix_id))
            .map(|f| f.estimated_fix_time_seconds)
            .sum();

        RunMetrics {
            attempted,
            succeeded,
            failed: report.failed.len(),
            skipped: report.skipped.len(),
            not_run: report.not_run.len(),
            manual_required: report.manual_required.len(),
            success_rate: ratio(succeeded, attempted),
            automation_rate: ratio(automated, automated + manual),
            time_saved_seconds,
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ExecutionResult, Fix, ManualGuidance, RunOutcome, RunStats, Severity, Violation,
    };

    fn plan_with(fix_times: &[u64], manual: usize) -> FixPlan {
        let mut plan = FixPlan::default();
        for (i, secs) in fix_times.iter().enumerate() {
            let v = Violation::new("color", Severity::Major, true).with_fix_time(*secs);
            let fix = Fix::from_violation(format!("fix-{}", i + 1), format!("v-{i}"), &v, 30);
            plan.execution_order.push(fix.id.clone());
            plan.automated_fixes.push(fix);
        }
        for i in 0..manual {
            plan.manual_fixes.push(ManualGuidance {
                violation_id: format!("m-{i}"),
                category: "imagery".into(),
                severity: Severity::Minor,
                instructions: "replace photo".into(),
                drafted: false,
                estimated_fix_time_seconds: 300,
            });
        }
        plan
    }

    fn report(succeeded: &[&str], failed: &[&str]) -> ExecutionReport {
        ExecutionReport {
            outcome: RunOutcome::Completed,
            dry_run: false,
            succeeded: succeeded
                .iter()
                .map(|id| ExecutionResult::succeeded(*id, 5, None))
                .collect(),
            failed: failed
                .iter()
                .map(|id| ExecutionResult::failed(*id, 5, "boom"))
                .collect(),
            skipped: Vec::new(),
            not_run: Vec::new(),
            manual_required: Vec::new(),
            backup: None,
            rolled_back: false,
            stats: RunStats {
                attempted: succeeded.len() + failed.len(),
                ..RunStats::default()
            },
            metrics: RunMetrics::default(),
        }
    }

    #[test]
    fn test_rates_and_time_saved() {
        let plan = plan_with(&[10, 20, 40], 1);
        let m = MetricsAggregator::compute(&plan, &report(&["fix-1", "fix-3"], &["fix-2"]));
        assert_eq!(m.attempted, 3);
        assert_eq!(m.succeeded, 2);
        assert_eq!(m.failed, 1);
        assert!((m.success_rate - 2.0 / 3.0).abs() < f64::EPSILON);
        assert!((m.automation_rate - 0.75).abs() < f64::EPSILON);
        assert_eq!(m.time_saved_seconds, 50);
    }

    #[test]
    fn test_nothing_attempted_is_zero_not_nan() {
        let plan = FixPlan::default();
        let m = MetricsAggregator::compute(&plan, &report(&[], &[]));
        assert_eq!(m.success_rate, 0.0);
        assert_eq!(m.automation_rate, 0.0);
        assert_eq!(m.time_saved_seconds, 0);
    }
}
