//! `docfix.toml` loading and CLI overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use docfix_channel::DEFAULT_CALL_TIMEOUT_MS;
use docfix_core::RunPolicy;
use serde::Deserialize;

pub const DEFAULT_HOST_ADDRESS: &str = "127.0.0.1:8013";

/// Where the editing host listens and how to back its document up.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub address: String,
    /// Host-side directory for remote backups.
    pub backup_dir: Option<String>,
    /// Local document path. When set, backups are file copies instead of
    /// host-side saves.
    pub document: Option<PathBuf>,
    pub timeout_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_HOST_ADDRESS.to_string(),
            backup_dir: None,
            document: None,
            timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DocfixConfig {
    pub host: HostConfig,
    pub policy: RunPolicy,
}

/// Flag values that win over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub backup_dir: Option<String>,
    pub document: Option<PathBuf>,
    pub dry_run: bool,
    pub max_fixes: Option<usize>,
    pub no_approval: bool,
    pub no_rollback: bool,
}

pub fn load_config(path: &Path) -> Result<DocfixConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config: {}", path.display()))?;
    parse_config(&content).with_context(|| format!("parsing config: {}", path.display()))
}

pub fn parse_config(content: &str) -> Result<DocfixConfig> {
    let config: DocfixConfig = toml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &DocfixConfig) -> Result<()> {
    if config.host.address.trim().is_empty() {
        anyhow::bail!("host.address must not be empty");
    }
    if config.host.timeout_ms == 0 {
        anyhow::bail!("host.timeout_ms must be positive");
    }
    if config.policy.max_fixes_per_run == 0 {
        anyhow::bail!("policy.max_fixes_per_run must be at least 1");
    }
    Ok(())
}

impl DocfixConfig {
    /// Load `path` when given, otherwise start from defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => load_config(p),
            None => Ok(Self::default()),
        }
    }

    pub fn apply(mut self, overrides: Overrides) -> Result<Self> {
        if let Some(host) = overrides.host {
            self.host.address = host;
        }
        if let Some(dir) = overrides.backup_dir {
            self.host.backup_dir = Some(dir);
        }
        if let Some(doc) = overrides.document {
            self.host.document = Some(doc);
        }
        if overrides.dry_run {
            self.policy.dry_run = true;
        }
        if let Some(max) = overrides.max_fixes {
            self.policy.max_fixes_per_run = max;
        }
        if overrides.no_approval {
            self.policy.require_approval = false;
        }
        if overrides.no_rollback {
            self.policy.rollback_on_failure = false;
        }
        validate_config(&self)?;
        Ok(self)
    }
}
