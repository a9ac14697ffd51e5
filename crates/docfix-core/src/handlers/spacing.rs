use async_trait::async_trait;
use serde_json::{json, Value};

use super::{
    action_or, base_args, num_param, str_param, wrap_script, FixHandler, HandlerError,
    HandlerResult,
};
use crate::domain::Fix;
use crate::drafting::TextDrafter;

const SPACING_PROPERTIES: [&str; 4] = ["spaceBefore", "spaceAfter", "leading", "tracking"];

const SPACING_BODY: &str = r#"var doc = app.activeDocument;
var styles = doc.allParagraphStyles;
var changed = 0;
for (var i = 0; i < styles.length; i++) {
  if (args.style && styles[i].name !== args.style) { continue; }
  styles[i][args.property] = args.amount;
  changed++;
}
return JSON.stringify({success: true, fixId: args.fixId, property: args.property, changed: changed});"#;

/// Normalizes paragraph spacing to the brand grid.
#[derive(Debug, Default)]
pub struct SpacingHandler;

#[async_trait]
impl FixHandler for SpacingHandler {
    fn name(&self) -> &'static str {
        "spacing"
    }

    async fn build_script(&self, fix: &Fix, _drafter: &dyn TextDrafter) -> HandlerResult<String> {
        let action = action_or(fix, "set_spacing");
        if action != "set_spacing" {
            return Err(HandlerError::UnsupportedAction {
                kind: "spacing",
                action: action.to_string(),
            });
        }

        let property = str_param(&fix.params, "property").unwrap_or("spaceAfter");
        if !SPACING_PROPERTIES.contains(&property) {
            return Err(HandlerError::InvalidParam {
                name: "property",
                reason: format!("unknown spacing property '{property}'"),
            });
        }

        let amount = match num_param(&fix.params, "amount")? {
            Some(a) => a,
            None => fix
                .expected
                .as_ref()
                .and_then(Value::as_f64)
                .ok_or(HandlerError::MissingParam("amount"))?,
        };
        if !amount.is_finite() || amount < 0.0 {
            return Err(HandlerError::InvalidParam {
                name: "amount",
                reason: format!("must be non-negative, got {amount}"),
            });
        }

        let mut args = base_args(fix);
        args.insert("property".into(), json!(property));
        args.insert("amount".into(), json!(amount));
        args.insert("style".into(), json!(str_param(&fix.params, "style")));
        Ok(wrap_script(&Value::Object(args), SPACING_BODY))
    }
}
