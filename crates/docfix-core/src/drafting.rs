//! Text drafting capability.
//!
//! The planner uses it to write manual-fix instructions and the
//! generative-content handler uses it to write replacement copy. Callers treat
//! it as fallible and never let a drafting failure escape the planner.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{Fix, Severity, Violation};

/// Errors from a drafting backend.
#[derive(Debug, Error)]
pub enum DraftError {
    #[error("drafting backend unavailable: {0}")]
    Unavailable(String),

    #[error("drafting backend returned no text")]
    Empty,

    #[error("drafting rejected request: {0}")]
    Rejected(String),
}

/// What the drafted text is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftPurpose {
    ManualInstructions,
    ReplacementCopy,
}

/// Everything a drafter may use to write text.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftRequest {
    pub purpose: DraftPurpose,
    pub category: String,
    pub severity: Severity,
    pub description: Option<String>,
    pub location: Option<String>,
    pub current: Option<Value>,
    pub expected: Option<Value>,
}

impl DraftRequest {
    pub fn instructions_for(violation: &Violation) -> Self {
        Self {
            purpose: DraftPurpose::ManualInstructions,
            category: violation.category.clone(),
            severity: violation.severity,
            description: violation.description.clone(),
            location: violation.location.as_ref().map(ToString::to_string),
            current: violation.current.clone(),
            expected: violation.expected.clone(),
        }
    }

    pub fn copy_for(fix: &Fix) -> Self {
        Self {
            purpose: DraftPurpose::ReplacementCopy,
            category: fix.category.clone(),
            severity: fix.priority,
            description: fix
                .params
                .get("prompt")
                .and_then(Value::as_str)
                .map(str::to_string),
            location: None,
            current: fix.current.clone(),
            expected: fix.expected.clone(),
        }
    }
}

/// Fallible async text generation.
#[async_trait]
pub trait TextDrafter: Send + Sync {
    async fn draft_text(&self, request: &DraftRequest) -> Result<String, DraftError>;
}

pub type SharedDrafter = Arc<dyn TextDrafter>;

/// Render a JSON payload for human-readable text.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Generic instruction template used whenever drafting fails.
pub fn generic_instructions(category: &str, severity: Severity) -> String {
    format!(
        "Review the {category} issue ({severity}) and correct it by hand so the document matches the brand guidelines."
    )
}

/// Deterministic drafter that fills templates from the request fields.
/// Used when no generative backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateDrafter;

#[async_trait]
impl TextDrafter for TemplateDrafter {
    async fn draft_text(&self, request: &DraftRequest) -> Result<String, DraftError> {
        match request.purpose {
            DraftPurpose::ManualInstructions => {
                let mut text = match &request.location {
                    Some(loc) => format!("Fix the {} issue at {loc}", request.category),
                    None => format!("Fix the {} issue", request.category),
                };
                if let Some(desc) = &request.description {
                    text.push_str(&format!(": {desc}"));
                }
                text.push('.');
                match (&request.current, &request.expected) {
                    (Some(cur), Some(exp)) => text.push_str(&format!(
                        " Change {} to {}.",
                        render_value(cur),
                        render_value(exp)
                    )),
                    (None, Some(exp)) => {
                        text.push_str(&format!(" Expected {}.", render_value(exp)))
                    }
                    _ => {}
                }
                Ok(text)
            }
            DraftPurpose::ReplacementCopy => request
                .expected
                .as_ref()
                .map(render_value)
                .filter(|s| !s.trim().is_empty())
                .ok_or(DraftError::Empty),
        }
    }
}
