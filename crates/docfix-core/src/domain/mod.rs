//! Domain types shared by the planner, the engine and reporting.

pub mod error;
pub mod fix;
pub mod plan;
pub mod report;
pub mod risk;
pub mod violation;

pub use error::{DocfixError, Result};
pub use fix::{Fix, FixKind, FixStatus};
pub use plan::{classify_risk, FixPlan, ManualGuidance};
pub use report::{ExecutionReport, ExecutionResult, RunOutcome, RunStats, SkippedFix};
pub use risk::{RiskLevel, Severity};
pub use violation::{parse_violations, FixStrategy, Location, Violation};
