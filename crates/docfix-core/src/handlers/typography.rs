use async_trait::async_trait;
use serde_json::{json, Value};

use super::{
    action_or, base_args, num_param, positive, str_param, wrap_script, FixHandler, HandlerError,
    HandlerResult,
};
use crate::domain::Fix;
use crate::drafting::TextDrafter;

const APPLY_FONT_BODY: &str = r#"var doc = app.activeDocument;
var styles = doc.allParagraphStyles;
var changed = 0;
for (var i = 0; i < styles.length; i++) {
  var s = styles[i];
  if (args.style && s.name !== args.style) { continue; }
  if (args.from && s.appliedFont && s.appliedFont.name.indexOf(args.from) !== 0) { continue; }
  try {
    s.appliedFont = args.font;
    if (args.size) { s.pointSize = args.size; }
    changed++;
  } catch (e) {
    return JSON.stringify({success: false, error: "cannot apply font " + args.font + ": " + e.message});
  }
}
return JSON.stringify({success: true, fixId: args.fixId, changed: changed});"#;

/// Applies the brand font (and optionally size) to paragraph styles.
#[derive(Debug, Default)]
pub struct TypographyHandler;

#[async_trait]
impl FixHandler for TypographyHandler {
    fn name(&self) -> &'static str {
        "typography"
    }

    async fn build_script(&self, fix: &Fix, _drafter: &dyn TextDrafter) -> HandlerResult<String> {
        let action = action_or(fix, "apply_font");
        if action != "apply_font" {
            return Err(HandlerError::UnsupportedAction {
                kind: "typography",
                action: action.to_string(),
            });
        }

        let font = str_param(&fix.params, "font")
            .or_else(|| fix.expected.as_ref().and_then(Value::as_str))
            .ok_or(HandlerError::MissingParam("font"))?;
        let size = num_param(&fix.params, "size")?
            .map(|s| positive("size", s))
            .transpose()?;

        let mut args = base_args(fix);
        args.insert("font".into(), json!(font));
        args.insert("size".into(), json!(size));
        args.insert("style".into(), json!(str_param(&fix.params, "style")));
        args.insert(
            "from".into(),
            json!(fix.current.as_ref().and_then(Value::as_str)),
        );
        Ok(wrap_script(&Value::Object(args), APPLY_FONT_BODY))
    }
}
