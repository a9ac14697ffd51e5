use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use super::{BackupError, BackupHandle, BackupResult, BackupStore};

/// Backup store for documents on a local filesystem.
///
/// Layout: `<backup_dir>/<file name>.<backup id>` with a sibling
/// `.sha256` sidecar holding the hex digest of the copy.
pub struct FileBackup {
    source: PathBuf,
    backup_dir: PathBuf,
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn sidecar_path(copy: &Path) -> PathBuf {
    let mut name = copy.as_os_str().to_os_string();
    name.push(".sha256");
    PathBuf::from(name)
}

/// Atomic write: temp file in the destination directory, then rename.
fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn create_blocking(source: &Path, backup_dir: &Path) -> BackupResult<BackupHandle> {
    let data = fs::read(source)?;
    fs::create_dir_all(backup_dir)?;

    let digest = sha256_hex(&data);
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());

    let mut handle = BackupHandle::new(String::new(), Some(digest.clone()));
    let copy = backup_dir.join(format!("{file_name}.{}", handle.id));
    write_atomic(&copy, &data)?;
    write_atomic(&sidecar_path(&copy), digest.as_bytes())?;

    handle.location = copy.to_string_lossy().into_owned();
    Ok(handle)
}

fn restore_blocking(source: &Path, handle: &BackupHandle) -> BackupResult<()> {
    if handle.location.is_empty() {
        return Err(BackupError::InvalidHandle(handle.id.clone()));
    }
    let copy = PathBuf::from(&handle.location);
    let data = fs::read(&copy)?;
    let recorded = fs::read_to_string(sidecar_path(&copy))?;
    let recorded = recorded.trim();
    let actual = sha256_hex(&data);

    if recorded != actual {
        return Err(BackupError::DigestMismatch {
            expected: recorded.to_string(),
            actual,
        });
    }
    if let Some(expected) = handle.digest.as_deref() {
        if expected != actual {
            return Err(BackupError::DigestMismatch {
                expected: expected.to_string(),
                actual,
            });
        }
    }

    write_atomic(source, &data)?;
    Ok(())
}

impl FileBackup {
    pub fn new(source: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            backup_dir: backup_dir.into(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

#[async_trait]
impl BackupStore for FileBackup {
    async fn create_backup(&self) -> BackupResult<BackupHandle> {
        let source = self.source.clone();
        let backup_dir = self.backup_dir.clone();
        tokio::task::spawn_blocking(move || create_blocking(&source, &backup_dir))
            .await
            .map_err(|e| BackupError::Task(e.to_string()))?
    }

    async fn restore(&self, handle: &BackupHandle) -> BackupResult<()> {
        let source = self.source.clone();
        let handle = handle.clone();
        tokio::task::spawn_blocking(move || restore_blocking(&source, &handle))
            .await
            .map_err(|e| BackupError::Task(e.to_string()))?
    }
}
