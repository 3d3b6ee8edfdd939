use async_trait::async_trait;
use fd_lock::RwLock;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{check_revision, upsert_into, StoreError, SubmissionStore};
use crate::approval::{Submission, SubmissionId};

/// Submissions kept as one JSON array on disk.
///
/// Every operation runs under an advisory lock on a sibling `.lock` file, so
/// several processes sharing the same data directory serialize their
/// read-modify-write cycles instead of clobbering each other.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock_path = lock_path_for(&path);
        Self { path, lock_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read<R, F>(&self, read: F) -> Result<R, StoreError>
    where
        F: FnOnce(Vec<Submission>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let path = self.path.clone();
        let lock_path = self.lock_path.clone();
        run_blocking(move || {
            let lock = RwLock::new(open_lock_file(&path, &lock_path)?);
            let _guard = lock.read()?;
            Ok(read(read_records(&path)?))
        })
        .await
    }

    /// Read-modify-write under the exclusive lock. The closure reports whether
    /// the list changed and needs to be written back.
    async fn modify<R, F>(&self, modify: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Vec<Submission>) -> Result<(R, bool), StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let path = self.path.clone();
        let lock_path = self.lock_path.clone();
        run_blocking(move || {
            let mut lock = RwLock::new(open_lock_file(&path, &lock_path)?);
            let _guard = lock.write()?;
            let mut records = read_records(&path)?;
            let (result, dirty) = modify(&mut records)?;
            if dirty {
                write_records(&path, &records)?;
                debug!(path = %path.display(), count = records.len(), "Submissions written");
            }
            Ok(result)
        })
        .await
    }
}

async fn run_blocking<R, F>(work: F) -> Result<R, StoreError>
where
    F: FnOnce() -> Result<R, StoreError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StoreError::LockError {
            reason: format!("store task failed: {}", e),
        })?
}

/// Sibling `<name>.lock` file guarding a JSON data file
pub(crate) fn lock_path_for(path: &Path) -> PathBuf {
    let mut lock_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "data.json".into());
    lock_name.push(".lock");
    path.with_file_name(lock_name)
}

pub(crate) fn open_lock_file(path: &Path, lock_path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .read(true)
        .open(lock_path)
}

fn read_records(path: &Path) -> Result<Vec<Submission>, StoreError> {
    match fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

fn write_records(path: &Path, records: &[Submission]) -> Result<(), StoreError> {
    let content = serde_json::to_string_pretty(records)?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, content)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        warn!(error = %e, "Atomic rename failed, writing in place");
        let _ = fs::remove_file(&tmp_path);
        fs::write(path, serde_json::to_string_pretty(records)?)?;
    }
    Ok(())
}

#[async_trait]
impl SubmissionStore for JsonFileStore {
    async fn list_all(&self) -> Result<Vec<Submission>, StoreError> {
        self.read(|records| records).await
    }

    async fn get_by_id(&self, id: &SubmissionId) -> Result<Option<Submission>, StoreError> {
        let id = id.clone();
        self.read(move |records| records.into_iter().find(|s| s.id == id))
            .await
    }

    async fn upsert(&self, submission: Submission) -> Result<(), StoreError> {
        self.modify(move |records| {
            upsert_into(records, submission);
            Ok(((), true))
        })
        .await
    }

    async fn replace_all(&self, submissions: Vec<Submission>) -> Result<(), StoreError> {
        self.modify(move |records| {
            *records = submissions;
            Ok(((), true))
        })
        .await
    }

    async fn remove(&self, id: &SubmissionId) -> Result<bool, StoreError> {
        let id = id.clone();
        self.modify(move |records| {
            let before = records.len();
            records.retain(|s| s.id != id);
            let removed = records.len() != before;
            Ok((removed, removed))
        })
        .await
    }

    async fn replace_if_revision(
        &self,
        expected_revision: u64,
        submission: Submission,
    ) -> Result<(), StoreError> {
        self.modify(move |records| {
            let index = check_revision(records, expected_revision, &submission.id)?;
            records[index] = submission;
            Ok(((), true))
        })
        .await
    }
}
