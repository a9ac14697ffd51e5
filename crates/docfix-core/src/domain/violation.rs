//! The violation record handed over by the (external) detectors.
//!
//! Wire shape is camelCase JSON. Only `category`, `severity` and
//! `automatable` are mandatory; everything else is defaulted during
//! planning.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::risk::{RiskLevel, Severity};

/// Where in the document a violation was found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.page, self.element.as_deref()) {
            (Some(page), Some(element)) => write!(f, "page {page}, {element}"),
            (Some(page), None) => write!(f, "page {page}"),
            (None, Some(element)) => write!(f, "{element}"),
            (None, None) => write!(f, "document"),
        }
    }
}

/// How the detector suggests fixing the violation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixStrategy {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskLevel>,
}

impl FixStrategy {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Default::default()
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk = Some(risk);
        self
    }
}

/// A detected deviation from a formatting or brand rule. Immutable once
/// produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub category: String,
    pub severity: Severity,
    pub automatable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_strategy: Option<FixStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_fix_time_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Violation {
    pub fn new(category: impl Into<String>, severity: Severity, automatable: bool) -> Self {
        Self {
            id: None,
            category: category.into(),
            severity,
            automatable,
            fix_strategy: None,
            estimated_fix_time_seconds: None,
            current: None,
            expected: None,
            description: None,
            location: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_strategy(mut self, strategy: FixStrategy) -> Self {
        self.fix_strategy = Some(strategy);
        self
    }

    pub fn with_fix_time(mut self, seconds: u64) -> Self {
        self.estimated_fix_time_seconds = Some(seconds);
        self
    }

    pub fn with_values(mut self, current: Value, expected: Value) -> Self {
        self.current = Some(current);
        self.expected = Some(expected);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

/// Parse a JSON array of violations as emitted by the detectors.
pub fn parse_violations(json: &str) -> serde_json::Result<Vec<Violation>> {
    serde_json::from_str(json)
}
