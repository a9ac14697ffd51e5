use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docfix_channel::{ScriptExecutor, DEFAULT_CALL_TIMEOUT};
use serde_json::{json, Value};

use super::{BackupError, BackupHandle, BackupResult, BackupStore};
use crate::handlers::interpret_result;

const SAVE_COPY_SCRIPT: &str = r#"(function(args){
if (app.documents.length === 0) { return JSON.stringify({success: false, error: "no active document"}); }
var doc = app.activeDocument;
var dir = new Folder(args.dir);
if (!dir.exists) { dir.create(); }
var stamp = new Date().getTime();
var target = new File(args.dir + "/" + doc.name.replace(/\.[^.]+$/, "") + "-" + stamp + ".indd");
doc.saveACopy(target);
return JSON.stringify({success: true, path: target.fsName});
})"#;

const REOPEN_SCRIPT: &str = r#"(function(args){
var copy = new File(args.path);
if (!copy.exists) { return JSON.stringify({success: false, error: "backup missing: " + args.path}); }
if (app.documents.length > 0) { app.activeDocument.close(SaveOptions.NO); }
app.open(copy);
return JSON.stringify({success: true, path: copy.fsName});
})"#;

/// Backs up the host's active document by asking the host to save a copy.
pub struct RemoteBackup {
    executor: Arc<dyn ScriptExecutor>,
    backup_dir: String,
    timeout: Duration,
}

impl RemoteBackup {
    pub fn new(executor: Arc<dyn ScriptExecutor>, backup_dir: impl Into<String>) -> Self {
        Self {
            executor,
            backup_dir: backup_dir.into(),
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, body: &str, args: Value) -> BackupResult<Value> {
        let script = format!("{body}({args});");
        let raw = self.executor.execute_script(&script, self.timeout).await?;
        interpret_result(raw).map_err(|e| BackupError::HostReported(e.to_string()))
    }
}

#[async_trait]
impl BackupStore for RemoteBackup {
    async fn create_backup(&self) -> BackupResult<BackupHandle> {
        let result = self
            .run(SAVE_COPY_SCRIPT, json!({"dir": self.backup_dir}))
            .await?;
        let path = result
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| BackupError::HostReported(format!("no backup path in {result}")))?;
        Ok(BackupHandle::new(path, None))
    }

    async fn restore(&self, handle: &BackupHandle) -> BackupResult<()> {
        if handle.location.is_empty() {
            return Err(BackupError::InvalidHandle(handle.id.clone()));
        }
        self.run(REOPEN_SCRIPT, json!({"path": handle.location}))
            .await?;
        Ok(())
    }
}
