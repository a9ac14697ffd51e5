//! Severity and risk bands used for routing, ordering and approval.

use serde::{Deserialize, Serialize};

/// Severity assigned to a violation by the detector.
///
/// Declaration order is business priority: critical work is planned first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
    Warning,
}

impl Severity {
    /// Severity buckets routed into a plan, in planning order.
    pub const PLANNED: [Severity; 3] = [Severity::Critical, Severity::Major, Severity::Minor];

    /// Sort rank; lower runs earlier.
    pub fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::Major => 1,
            Self::Minor => 2,
            Self::Warning => 3,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// Risk band attached to a fix through its violation's fix strategy.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Safe to apply unattended.
    Low,
    /// Needs an approval call when approval is required.
    #[default]
    Medium,
    /// Needs an approval call when approval is required.
    High,
}

impl RiskLevel {
    /// Sort rank; lower risk runs earlier within a severity.
    pub fn rank(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }

    /// Whether a fix in this band goes through the approval hook.
    pub fn requires_approval(self) -> bool {
        !matches!(self, Self::Low)
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}
