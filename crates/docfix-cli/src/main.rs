//! docfix - document remediation orchestrator CLI
//!
//! ## Commands
//!
//! - `plan`: synthesize and print a fix plan from detector output
//! - `run`: synthesize a plan and execute it against the editing host

mod config;
mod prompt;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use docfix_channel::{RemoteScriptChannel, ScriptExecutor, TcpConnector};
use docfix_core::{
    parse_violations, ApprovalHook, AutoApprove, BackupStore, ExecutionEngine, ExecutionReport,
    FileBackup, FixPlan, FixPlanSynthesizer, HandlerTable, RemoteBackup, RunPolicy, Violation,
};
use tracing::{info, Level};

use crate::config::{DocfixConfig, Overrides};
use crate::prompt::PromptApproval;

#[derive(Parser)]
#[command(name = "docfix")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Plan and apply brand/format fixes to documents", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Path to docfix.toml
    #[arg(short, long, global = true, env = "DOCFIX_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize a fix plan and print it
    Plan {
        /// Violations JSON file ("-" for stdin)
        #[arg(short = 'i', long)]
        violations: PathBuf,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Synthesize a fix plan and execute it against the host
    Run {
        /// Violations JSON file ("-" for stdin)
        #[arg(short = 'i', long)]
        violations: PathBuf,

        /// Host address (overrides [host].address)
        #[arg(long, env = "DOCFIX_HOST")]
        host: Option<String>,

        /// Host-side backup directory
        #[arg(long)]
        backup_dir: Option<String>,

        /// Local document path; switches backups to local file copies
        #[arg(long)]
        document: Option<PathBuf>,

        /// Preview without contacting the host
        #[arg(long)]
        dry_run: bool,

        /// Maximum fixes attempted in this run
        #[arg(long)]
        max_fixes: Option<usize>,

        /// Apply medium/high risk fixes without asking
        #[arg(long)]
        no_approval: bool,

        /// Approve every fix that asks (non-interactive)
        #[arg(long, conflicts_with = "no_approval")]
        approve_all: bool,

        /// Do not back up or roll back
        #[arg(long)]
        no_rollback: bool,

        /// Write the execution report JSON here
        #[arg(long)]
        report: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    docfix_core::telemetry::init_tracing(cli.json, level);

    let config = DocfixConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Plan { violations, format } => cmd_plan(&violations, format).await,
        Commands::Run {
            violations,
            host,
            backup_dir,
            document,
            dry_run,
            max_fixes,
            no_approval,
            approve_all,
            no_rollback,
            report,
            format,
        } => {
            let config = config.apply(Overrides {
                host,
                backup_dir,
                document,
                dry_run,
                max_fixes,
                no_approval,
                no_rollback,
            })?;
            cmd_run(&config, &violations, approve_all, report.as_deref(), format).await
        }
    }
}

fn read_violations(path: &Path) -> Result<Vec<Violation>> {
    let raw = if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("reading violations from stdin")?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("reading violations: {}", path.display()))?
    };
    parse_violations(&raw).with_context(|| format!("parsing violations: {}", path.display()))
}

async fn cmd_plan(violations: &Path, format: OutputFormat) -> Result<()> {
    let violations = read_violations(violations)?;
    let plan = FixPlanSynthesizer::default().synthesize(&violations).await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        OutputFormat::Text => print!("{}", render_plan(&plan)),
    }
    Ok(())
}

async fn cmd_run(
    config: &DocfixConfig,
    violations: &Path,
    approve_all: bool,
    report_path: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let policy = &config.policy;
    ensure_prompt_has_stdin(violations, policy, approve_all)?;
    let violations = read_violations(violations)?;
    let mut plan = FixPlanSynthesizer::default().synthesize(&violations).await;

    let mut channel = RemoteScriptChannel::new(TcpConnector::new(config.host.address.clone()));
    if !policy.dry_run {
        channel
            .connect()
            .await
            .with_context(|| format!("connecting to host at {}", config.host.address))?;
    }
    let channel = Arc::new(channel);
    let timeout = Duration::from_millis(config.host.timeout_ms);

    let approval: Arc<dyn ApprovalHook> = if approve_all {
        Arc::new(AutoApprove)
    } else {
        Arc::new(PromptApproval)
    };

    let mut engine = ExecutionEngine::new(channel.clone())
        .with_approval(approval)
        .with_handlers(HandlerTable::new().with_timeout(timeout));
    if let Some(store) = backup_store(config, channel.clone(), timeout) {
        engine = engine.with_backup(store);
    }

    info!(
        fixes = plan.automated_fixes.len(),
        manual = plan.manual_fixes.len(),
        risk = %plan.risk_level,
        "plan ready"
    );
    let report = engine.execute(&mut plan, policy).await;
    drop(engine);

    match Arc::try_unwrap(channel) {
        Ok(mut channel) if channel.is_connected() => channel.disconnect(),
        Ok(channel) => channel.stats().flush(),
        Err(shared) => shared.stats().flush(),
    }

    if let Some(path) = report_path {
        let json = serde_json::to_vec_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing report: {}", path.display()))?;
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print!("{}", render_report(&report)),
    }
    Ok(())
}

/// Interactive approval reads answers from stdin, so violations cannot
/// come from stdin too.
fn ensure_prompt_has_stdin(violations: &Path, policy: &RunPolicy, approve_all: bool) -> Result<()> {
    let prompts = policy.require_approval && !policy.dry_run && !approve_all;
    if prompts && violations == Path::new("-") {
        anyhow::bail!(
            "reading violations from stdin leaves no input for approval prompts; \
             pass --approve-all or --no-approval, or read violations from a file"
        );
    }
    Ok(())
}

fn backup_store(
    config: &DocfixConfig,
    executor: Arc<dyn ScriptExecutor>,
    timeout: Duration,
) -> Option<Arc<dyn BackupStore>> {
    if let Some(document) = &config.host.document {
        let dir = config
            .host
            .backup_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| document.with_extension("backups"));
        return Some(Arc::new(FileBackup::new(document.clone(), dir)));
    }
    config.host.backup_dir.as_ref().map(|dir| {
        Arc::new(RemoteBackup::new(executor, dir.clone()).with_timeout(timeout))
            as Arc<dyn BackupStore>
    })
}

fn render_plan(plan: &FixPlan) -> String {
    let mut out = format!(
        "Plan: {} automated, {} manual, risk {}, ~{}s\n",
        plan.automated_fixes.len(),
        plan.manual_fixes.len(),
        plan.risk_level,
        plan.estimated_total_seconds
    );
    for id in &plan.execution_order {
        if let Some(fix) = plan.fix(id) {
            out.push_str(&format!(
                "  {:<8} {:<8} {:<6} {:<18} {}\n",
                fix.id, fix.priority, fix.risk, fix.kind, fix.violation_id
            ));
        }
    }
    if !plan.manual_fixes.is_empty() {
        out.push_str("Manual:\n");
        for m in &plan.manual_fixes {
            out.push_str(&format!("  {} ({}): {}\n", m.violation_id, m.severity, m.instructions));
        }
    }
    if !plan.deferred_warnings.is_empty() {
        out.push_str(&format!("Deferred warnings: {}\n", plan.deferred_warnings.join(", ")));
    }
    out
}

fn render_report(report: &ExecutionReport) -> String {
    let m = &report.metrics;
    let mut out = format!(
        "Run {}{}: {} succeeded, {} failed, {} skipped, {} not run ({:.0}% success)\n",
        report.outcome,
        if report.dry_run { " (dry run)" } else { "" },
        m.succeeded,
        m.failed,
        m.skipped,
        m.not_run,
        m.success_rate * 100.0
    );
    for r in &report.failed {
        out.push_str(&format!(
            "  FAILED  {}: {}\n",
            r.fix_id,
            r.error.as_deref().unwrap_or("unknown error")
        ));
    }
    for s in &report.skipped {
        out.push_str(&format!("  SKIPPED {}: {}\n", s.fix_id, s.reason));
    }
    if let Some(backup) = &report.backup {
        out.push_str(&format!(
            "Backup {} at {}{}\n",
            backup.id,
            backup.location,
            if report.rolled_back { " (restored)" } else { "" }
        ));
    }
    for g in &report.manual_required {
        out.push_str(&format!("  MANUAL  {}: {}\n", g.violation_id, g.instructions));
    }
    out.push_str(&format!("Time saved: ~{}s\n", m.time_saved_seconds));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use docfix_core::fakes::ScriptedHost;
    use docfix_core::{FixStrategy, RiskLevel, Severity};
    use serde_json::json;

    #[test]
    fn test_cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "docfix",
            "run",
            "-i",
            "violations.json",
            "--dry-run",
            "--max-fixes",
            "5",
            "--approve-all",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                dry_run,
                max_fixes,
                approve_all,
                ..
            } => {
                assert!(dry_run);
                assert_eq!(max_fixes, Some(5));
                assert!(approve_all);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_approve_all_conflicts_with_no_approval() {
        let result = Cli::try_parse_from([
            "docfix",
            "run",
            "-i",
            "v.json",
            "--approve-all",
            "--no-approval",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_stdin_violations_need_non_interactive_approval() {
        let stdin = Path::new("-");
        let policy = RunPolicy::default();

        let err = ensure_prompt_has_stdin(stdin, &policy, false).unwrap_err();
        assert!(err.to_string().contains("--approve-all"));

        assert!(ensure_prompt_has_stdin(stdin, &policy, true).is_ok());
        assert!(ensure_prompt_has_stdin(stdin, &RunPolicy::unattended(), false).is_ok());
        assert!(ensure_prompt_has_stdin(stdin, &RunPolicy::dry_run(), false).is_ok());
        assert!(ensure_prompt_has_stdin(Path::new("v.json"), &policy, false).is_ok());
    }

    #[test]
    fn test_backup_store_selection() {
        let host: Arc<dyn ScriptExecutor> = Arc::new(ScriptedHost::new());
        let t = Duration::from_secs(1);

        let config = DocfixConfig::default();
        assert!(backup_store(&config, host.clone(), t).is_none());

        let mut remote = DocfixConfig::default();
        remote.host.backup_dir = Some("/backups".into());
        assert!(backup_store(&remote, host.clone(), t).is_some());

        let mut local = DocfixConfig::default();
        local.host.document = Some(PathBuf::from("/tmp/doc.indd"));
        assert!(backup_store(&local, host, t).is_some());
    }

    #[tokio::test]
    async fn test_render_plan_and_report() {
        let violations = vec![
            Violation::new("color", Severity::Critical, true).with_strategy(
                FixStrategy::new("color")
                    .with_param("to", json!("#00393F"))
                    .with_risk(RiskLevel::Low),
            ),
            Violation::new("imagery", Severity::Minor, false),
        ];
        let mut plan = FixPlanSynthesizer::default().synthesize(&violations).await;
        let text = render_plan(&plan);
        assert!(text.starts_with("Plan: 1 automated, 1 manual, risk low"));
        assert!(text.contains("fix-1"));
        assert!(text.contains("Manual:"));

        let report = ExecutionEngine::new(Arc::new(ScriptedHost::new()))
            .execute(&mut plan, &RunPolicy::dry_run())
            .await;
        let text = render_report(&report);
        assert!(text.starts_with("Run completed (dry run): 1 succeeded"));
        assert!(text.contains("MANUAL"));
    }
}
