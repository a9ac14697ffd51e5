//! Fix handlers: one per [`FixKind`], selected through an exhaustive table.
//!
//! A handler turns a fix into an opaque script fragment. The table sends the
//! fragment through the [`ScriptExecutor`] and interprets what comes back.

mod color;
mod generative;
mod geometry;
mod spacing;
mod typography;

use std::time::Duration;

use async_trait::async_trait;
use docfix_channel::{ChannelError, ScriptExecutor, DEFAULT_CALL_TIMEOUT};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::domain::{Fix, FixKind};
use crate::drafting::{DraftError, TextDrafter};

pub use color::ColorHandler;
pub use generative::GenerativeContentHandler;
pub use geometry::{FrameResizeHandler, PageResizeHandler};
pub use spacing::SpacingHandler;
pub use typography::TypographyHandler;

/// Errors from applying a single fix.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("no handler for fix type '{0}'")]
    UnknownType(String),

    #[error("missing parameter '{0}'")]
    MissingParam(&'static str),

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParam { name: &'static str, reason: String },

    #[error("unsupported action '{action}' for {kind} fix")]
    UnsupportedAction { kind: &'static str, action: String },

    #[error("drafting failed: {0}")]
    Draft(#[from] DraftError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("host reported failure: {0}")]
    HostReported(String),
}

impl HandlerError {
    /// True when the failure happened before anything reached the host.
    pub fn is_local(&self) -> bool {
        !matches!(self, Self::Channel(_) | Self::HostReported(_))
    }
}

pub type HandlerResult<T> = std::result::Result<T, HandlerError>;

/// Builds the script fragment for one kind of fix.
#[async_trait]
pub trait FixHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn build_script(&self, fix: &Fix, drafter: &dyn TextDrafter) -> HandlerResult<String>;
}

/// The dispatch table. Every known [`FixKind`] maps to exactly one handler.
#[derive(Debug, Default)]
pub struct HandlerTable {
    color: ColorHandler,
    typography: TypographyHandler,
    frame_resize: FrameResizeHandler,
    page_resize: PageResizeHandler,
    spacing: SpacingHandler,
    generative: GenerativeContentHandler,
    timeout: Option<Duration>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the per-call timeout (defaults to 30s).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn resolve(&self, kind: &FixKind) -> Option<&dyn FixHandler> {
        match kind {
            FixKind::Color => Some(&self.color),
            FixKind::Typography => Some(&self.typography),
            FixKind::FrameResize => Some(&self.frame_resize),
            FixKind::PageResize => Some(&self.page_resize),
            FixKind::Spacing => Some(&self.spacing),
            FixKind::GenerativeContent => Some(&self.generative),
            FixKind::Unknown(_) => None,
        }
    }

    /// Apply one fix against the host. Unknown kinds and parameter errors
    /// fail without touching the executor.
    pub async fn apply(
        &self,
        fix: &Fix,
        executor: &dyn ScriptExecutor,
        drafter: &dyn TextDrafter,
    ) -> HandlerResult<Value> {
        let handler = self
            .resolve(&fix.kind)
            .ok_or_else(|| HandlerError::UnknownType(fix.kind.to_string()))?;
        let script = handler.build_script(fix, drafter).await?;
        debug!(fix_id = %fix.id, handler = handler.name(), bytes = script.len(), "dispatching fix script");

        let timeout = self.timeout.unwrap_or(DEFAULT_CALL_TIMEOUT);
        let raw = executor.execute_script(&script, timeout).await?;
        interpret_result(raw)
    }
}

/// Interpret what the host returned for a fix script.
///
/// Hosts usually return the script's value as a string; JSON strings are
/// decoded first. An object with `"success": false` is a failure.
pub fn interpret_result(raw: Value) -> HandlerResult<Value> {
    let value = match raw {
        Value::String(s) => serde_json::from_str::<Value>(&s).unwrap_or(Value::String(s)),
        other => other,
    };

    if let Some(obj) = value.as_object() {
        if obj.get("success").and_then(Value::as_bool) == Some(false) {
            let message = obj
                .get("error")
                .or_else(|| obj.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("host returned success=false")
                .to_string();
            return Err(HandlerError::HostReported(message));
        }
    }
    Ok(value)
}

/// Wrap a script body into a self-invoking fragment with JSON arguments.
pub(crate) fn wrap_script(args: &Value, body: &str) -> String {
    format!("(function(args){{\n{body}\n}})({args});")
}

pub(crate) fn action_or<'a>(fix: &'a Fix, default: &'a str) -> &'a str {
    fix.action.as_deref().unwrap_or(default)
}

pub(crate) fn str_param<'a>(params: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub(crate) fn num_param(
    params: &Map<String, Value>,
    key: &'static str,
) -> HandlerResult<Option<f64>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_f64().map(Some).ok_or_else(|| HandlerError::InvalidParam {
            name: key,
            reason: format!("expected a number, got {v}"),
        }),
    }
}

pub(crate) fn positive(name: &'static str, value: f64) -> HandlerResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(HandlerError::InvalidParam {
            name,
            reason: format!("must be positive, got {value}"),
        })
    }
}

/// Common fragment metadata the host echoes back in its result.
pub(crate) fn base_args(fix: &Fix) -> Map<String, Value> {
    let mut args = Map::new();
    args.insert("fixId".into(), json!(fix.id));
    args.insert("category".into(), json!(fix.category));
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FixStrategy, Severity, Violation};
    use crate::drafting::TemplateDrafter;
    use crate::fakes::ScriptedHost;

    fn fix_of(strategy: FixStrategy) -> Fix {
        let v = Violation::new("color", Severity::Major, true).with_strategy(strategy);
        Fix::from_violation("fix-1", "v-1", &v, 30)
    }

    #[test]
    fn test_table_covers_known_kinds() {
        let table = HandlerTable::new();
        for kind in [
            FixKind::Color,
            FixKind::Typography,
            FixKind::FrameResize,
            FixKind::PageResize,
            FixKind::Spacing,
            FixKind::GenerativeContent,
        ] {
            assert!(table.resolve(&kind).is_some(), "no handler for {kind}");
        }
        assert!(table.resolve(&FixKind::Unknown("kerning".into())).is_none());
    }

    #[test]
    fn test_interpret_success_false_is_failure() {
        let err = interpret_result(json!({"success": false, "error": "no document open"}))
            .unwrap_err();
        assert!(matches!(err, HandlerError::HostReported(ref m) if m == "no document open"));

        let err = interpret_result(json!({"success": false, "message": "locked"})).unwrap_err();
        assert_eq!(err.to_string(), "host reported failure: locked");
    }

    #[test]
    fn test_interpret_decodes_json_strings() {
        let err = interpret_result(json!("{\"success\":false,\"error\":\"boom\"}")).unwrap_err();
        assert!(matches!(err, HandlerError::HostReported(_)));

        let ok = interpret_result(json!("{\"success\":true,\"changed\":4}")).unwrap();
        assert_eq!(ok["changed"], 4);

        let plain = interpret_result(json!("done")).unwrap();
        assert_eq!(plain, json!("done"));
    }

    #[test]
    fn test_interpret_other_values_succeed() {
        assert_eq!(interpret_result(Value::Null).unwrap(), Value::Null);
        assert_eq!(interpret_result(json!({"changed": 1})).unwrap()["changed"], 1);
    }

    #[tokio::test]
    async fn test_unknown_kind_never_reaches_host() {
        let host = ScriptedHost::new();
        let fix = fix_of(FixStrategy::new("kerning"));
        let err = HandlerTable::new()
            .apply(&fix, &host, &TemplateDrafter)
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::UnknownType(ref t) if t == "kerning"));
        assert!(err.is_local());
        assert_eq!(host.call_count(), 0);
    }

    #[tokio::test]
    async fn test_apply_sends_script_and_keeps_payload() {
        let host = ScriptedHost::new();
        host.push_ok(json!({"success": true, "changed": 2}));
        let fix = fix_of(FixStrategy::new("color").with_param("to", json!("#00393F")));
        let payload = HandlerTable::new()
            .apply(&fix, &host, &TemplateDrafter)
            .await
            .unwrap();
        assert_eq!(payload["changed"], 2);
        assert_eq!(host.call_count(), 1);
        assert!(host.scripts()[0].contains("\"fixId\":\"fix-1\""));
    }

    #[tokio::test]
    async fn test_channel_error_is_not_local() {
        let host = ScriptedHost::new();
        host.push_err(ChannelError::NotConnected);
        let fix = fix_of(FixStrategy::new("color").with_param("to", json!("#00393F")));
        let err = HandlerTable::new()
            .apply(&fix, &host, &TemplateDrafter)
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Channel(ChannelError::NotConnected)));
        assert!(!err.is_local());
    }
}
