//! In-memory fakes for the engine's collaborators (testing only)
//!
//! Provides `ScriptedHost`, `MemoryBackupStore`, `FailingBackupStore` and
//! `ScriptedApproval`, which satisfy the trait contracts without a real host.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use docfix_channel::{ChannelError, ChannelResult, ScriptExecutor};
use serde_json::{json, Value};

use crate::approval::{ApprovalDecision, ApprovalHook};
use crate::backup::{BackupError, BackupHandle, BackupResult, BackupStore};
use crate::domain::Fix;

// ---------------------------------------------------------------------------
// ScriptedHost
// ---------------------------------------------------------------------------

/// Script executor that replays queued responses in FIFO order and records
/// every script it receives. An empty queue answers `{"success": true}`.
#[derive(Debug, Default)]
pub struct ScriptedHost {
    responses: Mutex<VecDeque<ChannelResult<Value>>>,
    scripts: Mutex<Vec<String>>,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, value: Value) {
        self.responses.lock().unwrap().push_back(Ok(value));
    }

    pub fn push_err(&self, err: ChannelError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    /// Queue `n` host-reported failures.
    pub fn push_failures(&self, n: usize) {
        for _ in 0..n {
            self.push_ok(json!({"success": false, "error": "scripted failure"}));
        }
    }

    pub fn call_count(&self) -> usize {
        self.scripts.lock().unwrap().len()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScriptExecutor for ScriptedHost {
    async fn execute_script(&self, script: &str, _timeout: Duration) -> ChannelResult<Value> {
        self.scripts.lock().unwrap().push(script.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({"success": true})))
    }
}

// ---------------------------------------------------------------------------
// Backup stores
// ---------------------------------------------------------------------------

/// Backup store that keeps only bookkeeping.
#[derive(Debug, Default)]
pub struct MemoryBackupStore {
    created: Mutex<Vec<BackupHandle>>,
    restored: Mutex<Vec<String>>,
}

impl MemoryBackupStore {
    pub fn created(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    /// Ids of restored backups, in restore order.
    pub fn restored(&self) -> Vec<String> {
        self.restored.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackupStore for MemoryBackupStore {
    async fn create_backup(&self) -> BackupResult<BackupHandle> {
        let handle = BackupHandle::new("memory://document", None);
        self.created.lock().unwrap().push(handle.clone());
        Ok(handle)
    }

    async fn restore(&self, handle: &BackupHandle) -> BackupResult<()> {
        let known = self
            .created
            .lock()
            .unwrap()
            .iter()
            .any(|h| h.id == handle.id);
        if !known {
            return Err(BackupError::InvalidHandle(handle.id.clone()));
        }
        self.restored.lock().unwrap().push(handle.id.clone());
        Ok(())
    }
}

/// Backup store whose every operation fails.
#[derive(Debug, Default)]
pub struct FailingBackupStore;

#[async_trait]
impl BackupStore for FailingBackupStore {
    async fn create_backup(&self) -> BackupResult<BackupHandle> {
        Err(BackupError::HostReported("disk full".into()))
    }

    async fn restore(&self, handle: &BackupHandle) -> BackupResult<()> {
        Err(BackupError::InvalidHandle(handle.id.clone()))
    }
}

// ---------------------------------------------------------------------------
// ScriptedApproval
// ---------------------------------------------------------------------------

/// Approval hook with per-fix decisions. Fixes without an entry get the
/// fallback decision. Every consulted fix id is recorded.
#[derive(Debug)]
pub struct ScriptedApproval {
    decisions: HashMap<String, ApprovalDecision>,
    fallback: ApprovalDecision,
    asked: Mutex<Vec<String>>,
}

impl ScriptedApproval {
    pub fn approving() -> Self {
        Self::with_fallback(ApprovalDecision::Approve)
    }

    pub fn declining(reason: &str) -> Self {
        Self::with_fallback(ApprovalDecision::decline(reason))
    }

    fn with_fallback(fallback: ApprovalDecision) -> Self {
        Self {
            decisions: HashMap::new(),
            fallback,
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn decide(mut self, fix_id: &str, decision: ApprovalDecision) -> Self {
        self.decisions.insert(fix_id.to_string(), decision);
        self
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApprovalHook for ScriptedApproval {
    async fn approve(&self, fix: &Fix) -> ApprovalDecision {
        self.asked.lock().unwrap().push(fix.id.clone());
        self.decisions
            .get(&fix.id)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}
