// Record Store - persistence seam for submissions
//
// The approval core never touches storage. Callers go through this trait,
// which is small enough to back with a JSON file, memory, or SQLite.

use async_trait::async_trait;
use thiserror::Error;

use crate::approval::{Submission, SubmissionId};

#[cfg(feature = "database")]
pub mod database;
pub mod file;
pub mod memory;

#[cfg(feature = "database")]
pub use database::SqliteSubmissionStore;
pub use file::JsonFileStore;
pub use memory::InMemoryStore;

/// Errors that can occur during record store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Submission {0} not found")]
    NotFound(SubmissionId),

    #[error("Revision conflict on submission {id}: expected {expected}, found {found}")]
    RevisionConflict {
        id: SubmissionId,
        expected: u64,
        found: u64,
    },

    #[error("Lock acquisition failed: {reason}")]
    LockError { reason: String },

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Mapping from submission id to record.
///
/// No transactions and no history: `upsert` and `replace_all` are plain
/// last-write-wins writes. `replace_if_revision` is the one conditional write,
/// used by the review service to detect concurrent reviewers.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Every stored record
    async fn list_all(&self) -> Result<Vec<Submission>, StoreError>;

    async fn get_by_id(&self, id: &SubmissionId) -> Result<Option<Submission>, StoreError>;

    /// Insert or overwrite by id
    async fn upsert(&self, submission: Submission) -> Result<(), StoreError>;

    async fn replace_all(&self, submissions: Vec<Submission>) -> Result<(), StoreError>;

    /// Returns whether a record was removed
    async fn remove(&self, id: &SubmissionId) -> Result<bool, StoreError>;

    /// Overwrite the stored record only if its revision still equals
    /// `expected_revision`
    async fn replace_if_revision(
        &self,
        expected_revision: u64,
        submission: Submission,
    ) -> Result<(), StoreError>;
}

/// Shared revision check used by the in-process stores
pub(crate) fn check_revision(
    records: &[Submission],
    expected_revision: u64,
    id: &SubmissionId,
) -> Result<usize, StoreError> {
    let index = records
        .iter()
        .position(|s| &s.id == id)
        .ok_or_else(|| StoreError::NotFound(id.clone()))?;
    let found = records[index].revision;
    if found != expected_revision {
        return Err(StoreError::RevisionConflict {
            id: id.clone(),
            expected: expected_revision,
            found,
        });
    }
    Ok(index)
}

/// Insert-or-overwrite on a record list. New records go to the front so the
/// list reads newest first.
pub(crate) fn upsert_into(records: &mut Vec<Submission>, submission: Submission) {
    match records.iter().position(|s| s.id == submission.id) {
        Some(index) => records[index] = submission,
        None => records.insert(0, submission),
    }
}
