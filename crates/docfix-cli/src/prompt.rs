//! Interactive approval on stdin.

use std::io::{BufRead, Write};

use async_trait::async_trait;
use docfix_core::{ApprovalDecision, ApprovalHook, Fix};

/// Asks the operator about each fix that needs approval. Anything other than
/// `y`/`yes` declines.
pub struct PromptApproval;

fn describe(fix: &Fix) -> String {
    let mut line = format!(
        "{} [{} {} risk] {}",
        fix.id, fix.priority, fix.risk, fix.kind
    );
    if let Some(action) = &fix.action {
        line.push_str(&format!(" ({action})"));
    }
    if let (Some(cur), Some(exp)) = (&fix.current, &fix.expected) {
        line.push_str(&format!(": {cur} -> {exp}"));
    }
    line
}

pub fn parse_answer(answer: &str) -> ApprovalDecision {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => ApprovalDecision::Approve,
        "" => ApprovalDecision::decline("no answer"),
        _ => ApprovalDecision::decline("declined by operator"),
    }
}

#[async_trait]
impl ApprovalHook for PromptApproval {
    async fn approve(&self, fix: &Fix) -> ApprovalDecision {
        let question = describe(fix);
        let answer = tokio::task::spawn_blocking(move || {
            let mut stderr = std::io::stderr();
            let _ = write!(stderr, "Apply {question}? [y/N] ");
            let _ = stderr.flush();
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).map(|_| line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => parse_answer(&line),
            Ok(Err(e)) => ApprovalDecision::decline(format!("could not read answer: {e}")),
            Err(e) => ApprovalDecision::decline(format!("prompt failed: {e}")),
        }
    }
}
