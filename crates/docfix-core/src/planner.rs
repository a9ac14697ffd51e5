//! Plan synthesis: turn detector output into an ordered, risk-rated plan.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{classify_risk, Fix, FixPlan, ManualGuidance, Severity, Violation};
use crate::drafting::{generic_instructions, DraftRequest, TemplateDrafter, TextDrafter};

/// Time estimate used when a violation does not carry one.
pub const DEFAULT_FIX_TIME_SECS: u64 = 30;

/// Builds [`FixPlan`]s. Holds the drafting collaborator used for manual
/// guidance.
pub struct FixPlanSynthesizer {
    drafter: Arc<dyn TextDrafter>,
}

impl Default for FixPlanSynthesizer {
    fn default() -> Self {
        Self::new(Arc::new(TemplateDrafter))
    }
}

impl FixPlanSynthesizer {
    pub fn new(drafter: Arc<dyn TextDrafter>) -> Self {
        Self { drafter }
    }

    /// Synthesize a plan. Never fails: drafting problems degrade to the
    /// generic instruction template.
    pub async fn synthesize(&self, violations: &[Violation]) -> FixPlan {
        let mut plan = FixPlan::default();

        let ids: Vec<String> = violations
            .iter()
            .enumerate()
            .map(|(idx, v)| v.id.clone().unwrap_or_else(|| format!("violation-{}", idx + 1)))
            .collect();

        for severity in Severity::PLANNED {
            for (violation, violation_id) in violations.iter().zip(&ids) {
                if violation.severity != severity {
                    continue;
                }
                if violation.automatable {
                    let fix_id = format!("fix-{}", plan.automated_fixes.len() + 1);
                    let fix =
                        Fix::from_violation(fix_id, violation_id, violation, DEFAULT_FIX_TIME_SECS);
                    debug!(fix_id = %fix.id, violation_id = %violation_id, kind = %fix.kind, "planned automated fix");
                    plan.automated_fixes.push(fix);
                } else {
                    let guidance = self.manual_guidance(violation_id, violation).await;
                    plan.manual_fixes.push(guidance);
                }
            }
        }

        plan.deferred_warnings = violations
            .iter()
            .zip(&ids)
            .filter(|(v, _)| v.severity == Severity::Warning)
            .map(|(_, id)| id.clone())
            .collect();

        let mut ordered: Vec<&Fix> = plan.automated_fixes.iter().collect();
        ordered.sort_by_key(|f| (f.priority.rank(), f.risk.rank()));
        plan.execution_order = ordered.into_iter().map(|f| f.id.clone()).collect();

        plan.risk_level = classify_risk(plan.automated_fixes.iter().map(|f| f.risk));
        plan.estimated_total_seconds = plan
            .automated_fixes
            .iter()
            .map(|f| f.estimated_fix_time_seconds)
            .chain(plan.manual_fixes.iter().map(|m| m.estimated_fix_time_seconds))
            .sum();

        debug!(
            automated = plan.automated_fixes.len(),
            manual = plan.manual_fixes.len(),
            deferred = plan.deferred_warnings.len(),
            risk = %plan.risk_level,
            "plan synthesized"
        );
        plan
    }

    async fn manual_guidance(&self, violation_id: &str, violation: &Violation) -> ManualGuidance {
        let request = DraftRequest::instructions_for(violation);
        let (instructions, drafted) = match self.drafter.draft_text(&request).await {
            Ok(text) if !text.trim().is_empty() => (text.trim().to_string(), true),
            Ok(_) => {
                warn!(violation_id = %violation_id, "drafter returned blank instructions, using template");
                (generic_instructions(&violation.category, violation.severity), false)
            }
            Err(e) => {
                warn!(violation_id = %violation_id, error = %e, "drafting failed, using template");
                (generic_instructions(&violation.category, violation.severity), false)
            }
        };

        ManualGuidance {
            violation_id: violation_id.to_string(),
            category: violation.category.clone(),
            severity: violation.severity,
            instructions,
            drafted,
            estimated_fix_time_seconds: violation
                .estimated_fix_time_seconds
                .unwrap_or(DEFAULT_FIX_TIME_SECS),
        }
    }
}
