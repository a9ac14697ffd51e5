use async_trait::async_trait;
use serde_json::{json, Value};

use super::{action_or, base_args, str_param, wrap_script, FixHandler, HandlerError, HandlerResult};
use crate::domain::Fix;
use crate::drafting::{DraftError, DraftRequest, TextDrafter};

const REPLACE_TEXT_BODY: &str = r#"var doc = app.activeDocument;
var frame = args.frame ? doc.textFrames.itemByName(args.frame) : app.selection[0];
if (!frame || !frame.isValid) {
  return JSON.stringify({success: false, error: "text frame not found: " + (args.frame || "<selection>")});
}
frame.contents = args.text;
return JSON.stringify({success: true, fixId: args.fixId, overflows: frame.overflows});"#;

/// Replaces frame copy with supplied or drafted text.
#[derive(Debug, Default)]
pub struct GenerativeContentHandler;

#[async_trait]
impl FixHandler for GenerativeContentHandler {
    fn name(&self) -> &'static str {
        "generative-content"
    }

    async fn build_script(&self, fix: &Fix, drafter: &dyn TextDrafter) -> HandlerResult<String> {
        let action = action_or(fix, "replace_text");
        if action != "replace_text" {
            return Err(HandlerError::UnsupportedAction {
                kind: "generative-content",
                action: action.to_string(),
            });
        }

        let text = match str_param(&fix.params, "replacement") {
            Some(t) => t.to_string(),
            None => {
                let drafted = drafter.draft_text(&DraftRequest::copy_for(fix)).await?;
                let drafted = drafted.trim();
                if drafted.is_empty() {
                    return Err(HandlerError::Draft(DraftError::Empty));
                }
                drafted.to_string()
            }
        };

        let mut args = base_args(fix);
        args.insert("frame".into(), json!(str_param(&fix.params, "frame")));
        args.insert("text".into(), json!(text));
        Ok(wrap_script(&Value::Object(args), REPLACE_TEXT_BODY))
    }
}
