use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{check_revision, upsert_into, StoreError, SubmissionStore};
use crate::approval::{Submission, SubmissionId};

/// Volatile store for tests and embedding
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<Vec<Submission>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Submission>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait]
impl SubmissionStore for InMemoryStore {
    async fn list_all(&self) -> Result<Vec<Submission>, StoreError> {
        Ok(self.records.read().await.clone())
    }

    async fn get_by_id(&self, id: &SubmissionId) -> Result<Option<Submission>, StoreError> {
        Ok(self.records.read().await.iter().find(|s| &s.id == id).cloned())
    }

    async fn upsert(&self, submission: Submission) -> Result<(), StoreError> {
        upsert_into(&mut *self.records.write().await, submission);
        Ok(())
    }

    async fn replace_all(&self, submissions: Vec<Submission>) -> Result<(), StoreError> {
        *self.records.write().await = submissions;
        Ok(())
    }

    async fn remove(&self, id: &SubmissionId) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|s| &s.id != id);
        Ok(records.len() != before)
    }

    async fn replace_if_revision(
        &self,
        expected_revision: u64,
        submission: Submission,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let index = check_revision(&records, expected_revision, &submission.id)?;
        records[index] = submission;
        Ok(())
    }
}
