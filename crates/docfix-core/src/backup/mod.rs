//! Backup and rollback around a run.
//!
//! A [`BackupStore`] knows how to copy and restore the document. The
//! [`BackupCoordinator`] applies run policy around it: back up once at run
//! start, restore when the circuit breaker trips, never let either failure
//! abort the run.

pub mod fs;
pub mod remote;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docfix_channel::ChannelError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::obs;
use crate::policy::RunPolicy;

pub use fs::FileBackup;
pub use remote::RemoteBackup;

/// Errors from backup stores.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("host reported backup failure: {0}")]
    HostReported(String),

    #[error("backup digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("invalid backup handle: {0}")]
    InvalidHandle(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backup task failed: {0}")]
    Task(String),
}

pub type BackupResult<T> = std::result::Result<T, BackupError>;

/// Reference to a stored backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupHandle {
    pub id: String,
    /// Where the copy lives (host path or local path).
    pub location: String,
    pub created_at: DateTime<Utc>,
    /// Hex SHA-256 of the copy, when the store can compute one.
    pub digest: Option<String>,
}

impl BackupHandle {
    pub fn new(location: impl Into<String>, digest: Option<String>) -> Self {
        Self {
            id: format!("backup-{}", uuid::Uuid::new_v4()),
            location: location.into(),
            created_at: Utc::now(),
            digest,
        }
    }
}

#[async_trait]
pub trait BackupStore: Send + Sync {
    async fn create_backup(&self) -> BackupResult<BackupHandle>;

    async fn restore(&self, handle: &BackupHandle) -> BackupResult<()>;
}

/// Applies run policy around a [`BackupStore`].
#[derive(Clone)]
pub struct BackupCoordinator {
    store: Arc<dyn BackupStore>,
}

impl BackupCoordinator {
    pub fn new(store: Arc<dyn BackupStore>) -> Self {
        Self { store }
    }

    /// Take the run-start backup if the policy asks for one. Failures are
    /// logged and reported as `None`.
    pub async fn begin(&self, policy: &RunPolicy) -> Option<BackupHandle> {
        if policy.dry_run || !policy.rollback_on_failure {
            return None;
        }
        match self.store.create_backup().await {
            Ok(handle) => {
                info!(backup_id = %handle.id, location = %handle.location, "backup created");
                Some(handle)
            }
            Err(e) => {
                obs::emit_backup_failed("create", &e);
                None
            }
        }
    }

    /// Restore `handle`. Returns whether the document was rolled back.
    pub async fn rollback(&self, handle: &BackupHandle) -> bool {
        match self.store.restore(handle).await {
            Ok(()) => {
                info!(backup_id = %handle.id, "document restored from backup");
                true
            }
            Err(e) => {
                warn!(backup_id = %handle.id, "rollback failed");
                obs::emit_backup_failed("restore", &e);
                false
            }
        }
    }
}
