//! Fix plans: what will run automatically, in which order, and what a human
//! has to do.

use serde::{Deserialize, Serialize};

use super::fix::Fix;
use super::risk::{RiskLevel, Severity};

/// Human-actionable instructions for a violation that cannot be automated.
/// Surfaced in reports, never executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualGuidance {
    pub violation_id: String,
    pub category: String,
    pub severity: Severity,
    pub instructions: String,
    /// True when the instructions came from the drafting collaborator rather
    /// than the generic fallback.
    pub drafted: bool,
    pub estimated_fix_time_seconds: u64,
}

/// Classify a multiset of fix risks into the plan-wide risk band.
///
/// | Condition                      | Band   |
/// |--------------------------------|--------|
/// | high > 3 or medium > 10        | high   |
/// | high > 0 or medium > 5         | medium |
/// | otherwise                      | low    |
pub fn classify_risk(risks: impl IntoIterator<Item = RiskLevel>) -> RiskLevel {
    let (mut high, mut medium) = (0usize, 0usize);
    for risk in risks {
        match risk {
            RiskLevel::High => high += 1,
            RiskLevel::Medium => medium += 1,
            RiskLevel::Low => {}
        }
    }

    if high > 3 || medium > 10 {
        RiskLevel::High
    } else if high > 0 || medium > 5 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// The output of plan synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixPlan {
    pub automated_fixes: Vec<Fix>,
    pub manual_fixes: Vec<ManualGuidance>,
    /// A permutation of `automated_fixes` ids.
    pub execution_order: Vec<String>,
    pub estimated_total_seconds: u64,
    pub risk_level: RiskLevel,
    /// Warning-severity violations that were not routed into the plan.
    pub deferred_warnings: Vec<String>,
}

impl Default for FixPlan {
    fn default() -> Self {
        Self {
            automated_fixes: Vec::new(),
            manual_fixes: Vec::new(),
            execution_order: Vec::new(),
            estimated_total_seconds: 0,
            risk_level: RiskLevel::Low,
            deferred_warnings: Vec::new(),
        }
    }
}

impl FixPlan {
    pub fn is_empty(&self) -> bool {
        self.automated_fixes.is_empty() && self.manual_fixes.is_empty()
    }

    pub fn fix(&self, id: &str) -> Option<&Fix> {
        self.automated_fixes.iter().find(|f| f.id == id)
    }

    pub fn fix_mut(&mut self, id: &str) -> Option<&mut Fix> {
        self.automated_fixes.iter_mut().find(|f| f.id == id)
    }

    /// Recompute the risk band from the current fix list.
    pub fn recompute_risk_level(&self) -> RiskLevel {
        classify_risk(self.automated_fixes.iter().map(|f| f.risk))
    }

    /// True when `execution_order` contains every fix id exactly once.
    pub fn order_is_permutation(&self) -> bool {
        if self.execution_order.len() != self.automated_fixes.len() {
            return false;
        }
        let mut ordered: Vec<&str> = self.execution_order.iter().map(String::as_str).collect();
        let mut ids: Vec<&str> = self.automated_fixes.iter().map(|f| f.id.as_str()).collect();
        ordered.sort_unstable();
        ids.sort_unstable();
        ordered == ids
    }
}
