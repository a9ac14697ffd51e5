//! Planned, automatable remediations.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{DocfixError, Result};
use super::risk::{RiskLevel, Severity};
use super::violation::Violation;

/// Fix type, resolved once at planning time from the strategy's `type`
/// string. Anything unrecognised is kept verbatim in `Unknown` so the
/// engine can report it as a dispatch gap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FixKind {
    Color,
    Typography,
    FrameResize,
    PageResize,
    Spacing,
    GenerativeContent,
    Unknown(String),
}

impl FixKind {
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| *c != '-' && *c != '_' && *c != ' ')
            .collect();
        match normalized.as_str() {
            "color" | "colour" => Self::Color,
            "typography" | "font" => Self::Typography,
            "frameresize" => Self::FrameResize,
            "pageresize" => Self::PageResize,
            "spacing" => Self::Spacing,
            "generativecontent" | "content" => Self::GenerativeContent,
            _ => Self::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Color => "color",
            Self::Typography => "typography",
            Self::FrameResize => "frame-resize",
            Self::PageResize => "page-resize",
            Self::Spacing => "spacing",
            Self::GenerativeContent => "generative-content",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for FixKind {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<FixKind> for String {
    fn from(kind: FixKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for FixKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a fix within a run. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixStatus {
    Pending,
    Approved,
    Skipped,
    Succeeded,
    Failed,
}

impl FixStatus {
    /// Whether `self -> next` is a legal forward step.
    pub fn can_transition_to(self, next: FixStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Skipped)
                | (Self::Approved, Self::Succeeded)
                | (Self::Approved, Self::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Skipped | Self::Succeeded | Self::Failed)
    }
}

impl std::fmt::Display for FixStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Skipped => write!(f, "skipped"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A planned remediation derived from one automatable violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub id: String,
    pub violation_id: String,
    pub category: String,
    /// Equal to the source violation's severity.
    pub priority: Severity,
    pub kind: FixKind,
    pub action: Option<String>,
    pub params: Map<String, Value>,
    pub risk: RiskLevel,
    pub estimated_fix_time_seconds: u64,
    pub current: Option<Value>,
    pub expected: Option<Value>,
    pub status: FixStatus,
    /// Always empty: fixes are planned at single-fix granularity.
    pub dependencies: Vec<String>,
}

impl Fix {
    /// Derive a fix from an automatable violation, substituting defaults for
    /// anything the detector left out.
    pub fn from_violation(
        id: impl Into<String>,
        violation_id: impl Into<String>,
        violation: &Violation,
        fallback_time_secs: u64,
    ) -> Self {
        let strategy = violation.fix_strategy.clone().unwrap_or_default();
        let kind = strategy
            .kind
            .as_deref()
            .map(FixKind::parse)
            .unwrap_or_else(|| FixKind::Unknown("unknown".to_string()));

        Self {
            id: id.into(),
            violation_id: violation_id.into(),
            category: violation.category.clone(),
            priority: violation.severity,
            kind,
            action: strategy.action,
            params: strategy.params,
            risk: strategy.risk.unwrap_or_default(),
            estimated_fix_time_seconds: violation
                .estimated_fix_time_seconds
                .unwrap_or(fallback_time_secs),
            current: violation.current.clone(),
            expected: violation.expected.clone(),
            status: FixStatus::Pending,
            dependencies: Vec::new(),
        }
    }

    /// Move to `next`, rejecting anything but a forward step.
    pub fn advance(&mut self, next: FixStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(DocfixError::InvalidTransition {
                fix_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::violation::FixStrategy;

    #[test]
    fn test_kind_parse_accepts_spellings() {
        assert_eq!(FixKind::parse("color"), FixKind::Color);
        assert_eq!(FixKind::parse("Frame-Resize"), FixKind::FrameResize);
        assert_eq!(FixKind::parse("page_resize"), FixKind::PageResize);
        assert_eq!(FixKind::parse("generativeContent"), FixKind::GenerativeContent);
        assert_eq!(
            FixKind::parse("kerning"),
            FixKind::Unknown("kerning".to_string())
        );
    }

    #[test]
    fn test_kind_serializes_as_string() {
        let json = serde_json::to_string(&FixKind::FrameResize).unwrap();
        assert_eq!(json, "\"frame-resize\"");
        let back: FixKind = serde_json::from_str("\"spacing\"").unwrap();
        assert_eq!(back, FixKind::Spacing);
    }

    #[test]
    fn test_forward_transitions_only() {
        use FixStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Skipped));
        assert!(Approved.can_transition_to(Succeeded));
        assert!(Approved.can_transition_to(Failed));

        assert!(!Approved.can_transition_to(Pending));
        assert!(!Succeeded.can_transition_to(Failed));
        assert!(!Skipped.can_transition_to(Approved));
        assert!(!Pending.can_transition_to(Succeeded));
        assert!(!Failed.can_transition_to(Failed));
    }

    #[test]
    fn test_advance_rejects_regression() {
        let v = Violation::new("color", Severity::Major, true);
        let mut fix = Fix::from_violation("fix-1", "v-1", &v, 30);
        fix.advance(FixStatus::Approved).unwrap();
        fix.advance(FixStatus::Succeeded).unwrap();
        let err = fix.advance(FixStatus::Pending).unwrap_err();
        assert!(matches!(err, DocfixError::InvalidTransition { .. }));
        assert_eq!(fix.status, FixStatus::Succeeded);
    }

    #[test]
    fn test_from_violation_defaults() {
        let v = Violation::new("layout", Severity::Minor, true);
        let fix = Fix::from_violation("fix-1", "v-9", &v, 30);
        assert_eq!(fix.kind, FixKind::Unknown("unknown".to_string()));
        assert_eq!(fix.risk, RiskLevel::Medium);
        assert_eq!(fix.estimated_fix_time_seconds, 30);
        assert_eq!(fix.priority, Severity::Minor);
        assert_eq!(fix.status, FixStatus::Pending);
        assert!(fix.dependencies.is_empty());
    }

    #[test]
    fn test_from_violation_keeps_strategy() {
        let v = Violation::new("color", Severity::Critical, true)
            .with_strategy(
                FixStrategy::new("color")
                    .with_action("replace_color")
                    .with_risk(RiskLevel::Low),
            )
            .with_fix_time(12);
        let fix = Fix::from_violation("fix-2", "v-2", &v, 30);
        assert_eq!(fix.kind, FixKind::Color);
        assert_eq!(fix.action.as_deref(), Some("replace_color"));
        assert_eq!(fix.risk, RiskLevel::Low);
        assert_eq!(fix.estimated_fix_time_seconds, 12);
    }
}
