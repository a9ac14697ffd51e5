//! Frame and page resizing.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::{
    action_or, base_args, num_param, positive, str_param, wrap_script, FixHandler, HandlerError,
    HandlerResult,
};
use crate::domain::Fix;
use crate::drafting::TextDrafter;

const FRAME_BODY: &str = r#"var doc = app.activeDocument;
var frame = args.frame ? doc.pageItems.itemByName(args.frame) : app.selection[0];
if (!frame || !frame.isValid) {
  return JSON.stringify({success: false, error: "frame not found: " + (args.frame || "<selection>")});
}
var b = frame.geometricBounds;
frame.geometricBounds = [b[0], b[1], b[0] + args.height, b[1] + args.width];
return JSON.stringify({success: true, fixId: args.fixId, bounds: frame.geometricBounds});"#;

const PAGE_BODY: &str = r#"var doc = app.activeDocument;
doc.documentPreferences.pageWidth = args.width;
doc.documentPreferences.pageHeight = args.height;
return JSON.stringify({success: true, fixId: args.fixId, width: args.width, height: args.height});"#;

/// Width and height from params, falling back to `expected: {width, height}`.
fn dimensions(fix: &Fix) -> HandlerResult<(f64, f64)> {
    let empty = Map::new();
    let expected = fix
        .expected
        .as_ref()
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let pick = |key: &'static str| -> HandlerResult<f64> {
        let value = match num_param(&fix.params, key)? {
            Some(v) => v,
            None => num_param(expected, key)?.ok_or(HandlerError::MissingParam(key))?,
        };
        positive(key, value)
    };
    Ok((pick("width")?, pick("height")?))
}

fn check_action(fix: &Fix, kind: &'static str) -> HandlerResult<()> {
    let action = action_or(fix, "resize");
    if action == "resize" {
        Ok(())
    } else {
        Err(HandlerError::UnsupportedAction {
            kind,
            action: action.to_string(),
        })
    }
}

/// Resizes a named frame (or the current selection).
#[derive(Debug, Default)]
pub struct FrameResizeHandler;

#[async_trait]
impl FixHandler for FrameResizeHandler {
    fn name(&self) -> &'static str {
        "frame-resize"
    }

    async fn build_script(&self, fix: &Fix, _drafter: &dyn TextDrafter) -> HandlerResult<String> {
        check_action(fix, "frame-resize")?;
        let (width, height) = dimensions(fix)?;
        let mut args = base_args(fix);
        args.insert("frame".into(), json!(str_param(&fix.params, "frame")));
        args.insert("width".into(), json!(width));
        args.insert("height".into(), json!(height));
        Ok(wrap_script(&Value::Object(args), FRAME_BODY))
    }
}

/// Sets the document page size.
#[derive(Debug, Default)]
pub struct PageResizeHandler;

#[async_trait]
impl FixHandler for PageResizeHandler {
    fn name(&self) -> &'static str {
        "page-resize"
    }

    async fn build_script(&self, fix: &Fix, _drafter: &dyn TextDrafter) -> HandlerResult<String> {
        check_action(fix, "page-resize")?;
        let (width, height) = dimensions(fix)?;
        let mut args = base_args(fix);
        args.insert("width".into(), json!(width));
        args.insert("height".into(), json!(height));
        Ok(wrap_script(&Value::Object(args), PAGE_BODY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FixStrategy, Severity, Violation};
    use crate::drafting::TemplateDrafter;

    fn fix(kind: &str, strategy: FixStrategy, expected: Option<Value>) -> Fix {
        let mut v = Violation::new("layout", Severity::Major, true)
            .with_strategy(FixStrategy { kind: Some(kind.into()), ..strategy });
        v.expected = expected;
        Fix::from_violation("fix-1", "v-1", &v, 30)
    }

    #[tokio::test]
    async fn test_page_size_from_expected() {
        let f = fix(
            "page-resize",
            FixStrategy::default(),
            Some(json!({"width": 612, "height": 792})),
        );
        let script = PageResizeHandler
            .build_script(&f, &TemplateDrafter)
            .await
            .unwrap();
        assert!(script.contains("\"width\":612.0"));
        assert!(script.contains("\"height\":792.0"));
    }

    #[tokio::test]
    async fn test_params_override_expected() {
        let f = fix(
            "frame-resize",
            FixStrategy::default()
                .with_param("width", json!(100))
                .with_param("frame", json!("hero")),
            Some(json!({"width": 50, "height": 40})),
        );
        let script = FrameResizeHandler
            .build_script(&f, &TemplateDrafter)
            .await
            .unwrap();
        assert!(script.contains("\"width\":100.0"));
        assert!(script.contains("\"height\":40.0"));
        assert!(script.contains("\"frame\":\"hero\""));
    }

    #[tokio::test]
    async fn test_missing_height() {
        let f = fix(
            "frame-resize",
            FixStrategy::default().with_param("width", json!(10)),
            None,
        );
        let err = FrameResizeHandler
            .build_script(&f, &TemplateDrafter)
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::MissingParam("height")));
    }

    #[tokio::test]
    async fn test_rejects_non_positive() {
        let f = fix(
            "page-resize",
            FixStrategy::default()
                .with_param("width", json!(0))
                .with_param("height", json!(10)),
            None,
        );
        let err = PageResizeHandler
            .build_script(&f, &TemplateDrafter)
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::InvalidParam { name: "width", .. }));
    }
}
