//! Approval gate consulted for non-low-risk fixes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::Fix;

/// Verdict for one fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approve,
    Decline { reason: String },
}

impl ApprovalDecision {
    pub fn decline(reason: impl Into<String>) -> Self {
        Self::Decline {
            reason: reason.into(),
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approve)
    }
}

#[async_trait]
pub trait ApprovalHook: Send + Sync {
    async fn approve(&self, fix: &Fix) -> ApprovalDecision;
}

/// Approves everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl ApprovalHook for AutoApprove {
    async fn approve(&self, _fix: &Fix) -> ApprovalDecision {
        ApprovalDecision::Approve
    }
}

/// Declines everything. The engine's default when no hook is supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclineAll;

#[async_trait]
impl ApprovalHook for DeclineAll {
    async fn approve(&self, fix: &Fix) -> ApprovalDecision {
        ApprovalDecision::decline(format!("approval required for {} risk fix", fix.risk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Severity, Violation};

    fn fix() -> Fix {
        Fix::from_violation(
            "fix-1",
            "v-1",
            &Violation::new("color", Severity::Major, true),
            30,
        )
    }

    #[tokio::test]
    async fn test_auto_approve() {
        assert!(AutoApprove.approve(&fix()).await.is_approved());
    }

    #[tokio::test]
    async fn test_decline_all_gives_reason() {
        match DeclineAll.approve(&fix()).await {
            ApprovalDecision::Decline { reason } => assert!(reason.contains("medium")),
            other => panic!("expected decline, got {other:?}"),
        }
    }
}
