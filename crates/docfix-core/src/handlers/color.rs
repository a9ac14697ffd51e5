use async_trait::async_trait;
use serde_json::{json, Value};

use super::{action_or, base_args, str_param, wrap_script, FixHandler, HandlerError, HandlerResult};
use crate::domain::Fix;
use crate::drafting::TextDrafter;

const REPLACE_BODY: &str = r#"var doc = app.activeDocument;
var target = doc.colors.itemByName(args.swatch);
if (!target.isValid) {
  target = doc.colors.add({name: args.swatch, model: ColorModel.PROCESS, space: ColorSpace.RGB, colorValue: args.rgb});
} else {
  target.colorValue = args.rgb;
}
var changed = 0;
if (args.from) {
  var items = doc.allPageItems;
  for (var i = 0; i < items.length; i++) {
    var fill = items[i].fillColor;
    if (fill && fill.isValid && fill.name === args.from) { items[i].fillColor = target; changed++; }
  }
}
return JSON.stringify({success: true, fixId: args.fixId, swatch: target.name, changed: changed});"#;

/// Parse `#RRGGBB` (or `RRGGBB`) into RGB components.
pub(crate) fn parse_hex(raw: &str) -> Option<[u8; 3]> {
    let hex = raw.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// Replaces an off-brand color with the expected brand color.
#[derive(Debug, Default)]
pub struct ColorHandler;

#[async_trait]
impl FixHandler for ColorHandler {
    fn name(&self) -> &'static str {
        "color"
    }

    async fn build_script(&self, fix: &Fix, _drafter: &dyn TextDrafter) -> HandlerResult<String> {
        let action = action_or(fix, "replace_color");
        if action != "replace_color" {
            return Err(HandlerError::UnsupportedAction {
                kind: "color",
                action: action.to_string(),
            });
        }

        let to = str_param(&fix.params, "to")
            .or_else(|| fix.expected.as_ref().and_then(Value::as_str))
            .ok_or(HandlerError::MissingParam("to"))?;
        let rgb = parse_hex(to).ok_or_else(|| HandlerError::InvalidParam {
            name: "to",
            reason: format!("'{to}' is not a #RRGGBB color"),
        })?;
        let swatch = str_param(&fix.params, "swatch").unwrap_or(to);
        let from = str_param(&fix.params, "from")
            .or_else(|| fix.current.as_ref().and_then(Value::as_str));

        let mut args = base_args(fix);
        args.insert("swatch".into(), json!(swatch));
        args.insert("rgb".into(), json!(rgb));
        args.insert("from".into(), json!(from));
        Ok(wrap_script(&Value::Object(args), REPLACE_BODY))
    }
}
