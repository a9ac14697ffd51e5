//! docfix Core Library
//!
//! Plans remediation of detected document violations and executes the plan
//! against a remote editing host with approval gating, a circuit breaker,
//! a per-run cap and backup/rollback.

pub mod approval;
pub mod backup;
pub mod domain;
pub mod drafting;
pub mod engine;
pub mod fakes;
pub mod handlers;
pub mod metrics;
pub mod obs;
pub mod planner;
pub mod policy;
pub mod telemetry;

pub use approval::{ApprovalDecision, ApprovalHook, AutoApprove, DeclineAll};

pub use backup::{
    BackupCoordinator, BackupError, BackupHandle, BackupResult, BackupStore, FileBackup,
    RemoteBackup,
};

pub use domain::{
    classify_risk, parse_violations, DocfixError, ExecutionReport, ExecutionResult, Fix, FixKind,
    FixPlan, FixStatus, FixStrategy, Location, ManualGuidance, Result, RiskLevel, RunOutcome,
    RunStats, Severity, SkippedFix, Violation,
};

pub use drafting::{DraftError, DraftPurpose, DraftRequest, TemplateDrafter, TextDrafter};

pub use engine::{CircuitBreaker, ExecutionEngine, RunState};

pub use handlers::{FixHandler, HandlerError, HandlerTable};

pub use metrics::{MetricsAggregator, RunMetrics};

pub use planner::{FixPlanSynthesizer, DEFAULT_FIX_TIME_SECS};

pub use policy::{RunPolicy, CIRCUIT_BREAKER_THRESHOLD, DEFAULT_MAX_FIXES_PER_RUN};
