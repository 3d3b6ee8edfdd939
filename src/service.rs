// Review Service - loads a record, runs the approval machine, writes it back
//
// Transitions on the same record are serialized in-process by a per-record
// mutex; across processes the store's revision check rejects stale writers.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn, Instrument};

use crate::approval::{
    resubmit, ActorIdentity, ApprovalError, ApprovalMachine, FieldValue, RequestFields,
    Resubmission, ReviewField, ReviewStatus, Stage, Submission, SubmissionId,
};
use crate::store::{StoreError, SubmissionStore};
use crate::summary::{SummaryError, SummaryProjection};
use crate::telemetry::{create_review_span, generate_correlation_id};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Approval(#[from] ApprovalError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Summary(#[from] SummaryError),

    #[error("Submission {0} not found")]
    NotFound(SubmissionId),
}

impl ServiceError {
    /// Approval failures are user-facing validation messages
    pub fn is_validation(&self) -> bool {
        matches!(self, ServiceError::Approval(_))
    }

    /// Another reviewer wrote the record first; reloading and retrying is safe
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ServiceError::Store(StoreError::RevisionConflict { .. })
        )
    }
}

pub struct ReviewService {
    store: Arc<dyn SubmissionStore>,
    machine: ApprovalMachine,
    record_locks: Mutex<HashMap<SubmissionId, Arc<Mutex<()>>>>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn SubmissionStore>, machine: ApprovalMachine) -> Self {
        Self {
            store,
            machine,
            record_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn SubmissionStore> {
        &self.store
    }

    pub fn machine(&self) -> &ApprovalMachine {
        &self.machine
    }

    async fn record_lock(&self, id: &SubmissionId) -> Arc<Mutex<()>> {
        let mut locks = self.record_locks.lock().await;
        locks
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the map entry once no other task holds or waits on it
    async fn release_record_lock(&self, id: &SubmissionId, lock: Arc<Mutex<()>>) {
        let mut locks = self.record_locks.lock().await;
        // Clones are only handed out under the map lock: the entry plus ours
        if Arc::strong_count(&lock) <= 2 && locks.get(id).is_some_and(|held| Arc::ptr_eq(held, &lock)) {
            locks.remove(id);
        }
    }

    /// Run `work` while holding the record's mutex
    async fn with_record_lock<T, F>(&self, id: &SubmissionId, work: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        let lock = self.record_lock(id).await;
        let result = {
            let _guard = lock.lock().await;
            work.await
        };
        self.release_record_lock(id, lock).await;
        result
    }

    #[cfg(test)]
    async fn tracked_locks(&self) -> usize {
        self.record_locks.lock().await.len()
    }

    async fn load(&self, id: &SubmissionId) -> Result<Submission, ServiceError> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(id.clone()))
    }

    /// Write `next` over `current`, bumping the revision
    async fn commit(&self, current: &Submission, mut next: Submission) -> Result<Submission, ServiceError> {
        next.revision = current.revision + 1;
        if let Err(e) = self
            .store
            .replace_if_revision(current.revision, next.clone())
            .await
        {
            warn!(submission.id = %current.id, error = %e, "Submission write rejected");
            return Err(e.into());
        }
        Ok(next)
    }

    /// Create a new request owned by `actor`
    pub async fn submit(&self, actor: &ActorIdentity, fields: RequestFields) -> Result<Submission, ServiceError> {
        let submission = Submission::new(actor.username.clone(), fields, Utc::now());
        self.store.upsert(submission.clone()).await?;
        info!(submission.id = %submission.id, applicant = %actor.username, "Submission created");
        Ok(submission)
    }

    pub async fn get(&self, id: &SubmissionId) -> Result<Submission, ServiceError> {
        self.load(id).await
    }

    pub async fn list(&self) -> Result<Vec<Submission>, ServiceError> {
        Ok(self.store.list_all().await?)
    }

    pub async fn apply(
        &self,
        id: &SubmissionId,
        field: ReviewField,
        value: FieldValue,
        actor: &ActorIdentity,
        comment: Option<&str>,
    ) -> Result<Submission, ServiceError> {
        self.apply_at(id, field, value, actor, comment, Utc::now()).await
    }

    /// Load, transition and persist a single record
    pub async fn apply_at(
        &self,
        id: &SubmissionId,
        field: ReviewField,
        value: FieldValue,
        actor: &ActorIdentity,
        comment: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Submission, ServiceError> {
        let correlation_id = generate_correlation_id();
        let span = create_review_span(
            "apply_transition",
            Some(id.as_str()),
            Some(&actor.username),
            Some(&correlation_id),
        );

        let work = async {
            let current = self.load(id).await?;
            let next = match self
                .machine
                .apply_transition_at(&current, field, value.clone(), actor, comment, now)
            {
                Ok(next) => next,
                Err(e) => {
                    info!(submission.id = %id, field = %field, reason = %e, "Transition refused");
                    return Err(e.into());
                }
            };
            let saved = self.commit(&current, next).await?;
            info!(
                submission.id = %id,
                field = %field,
                value = %value,
                revision = saved.revision,
                "Transition recorded"
            );
            Ok::<Submission, ServiceError>(saved)
        };
        self.with_record_lock(id, work).instrument(span).await
    }

    pub async fn approve_stage(&self, id: &SubmissionId, stage: Stage, actor: &ActorIdentity) -> Result<Submission, ServiceError> {
        self.apply(
            id,
            ReviewField::Stage(stage),
            FieldValue::Status(ReviewStatus::Approved),
            actor,
            None,
        )
        .await
    }

    pub async fn reject_stage(
        &self,
        id: &SubmissionId,
        stage: Stage,
        actor: &ActorIdentity,
        comment: &str,
    ) -> Result<Submission, ServiceError> {
        self.apply(
            id,
            ReviewField::Stage(stage),
            FieldValue::Status(ReviewStatus::Rejected),
            actor,
            Some(comment),
        )
        .await
    }

    pub async fn attach_file(&self, id: &SubmissionId, name: &str, actor: &ActorIdentity) -> Result<Submission, ServiceError> {
        self.apply(
            id,
            ReviewField::ApprovedFile,
            FieldValue::File(Some(name.to_string())),
            actor,
            None,
        )
        .await
    }

    pub async fn detach_file(&self, id: &SubmissionId, actor: &ActorIdentity) -> Result<Submission, ServiceError> {
        self.apply(id, ReviewField::ApprovedFile, FieldValue::File(None), actor, None)
            .await
    }

    pub async fn decide_final(
        &self,
        id: &SubmissionId,
        status: ReviewStatus,
        actor: &ActorIdentity,
    ) -> Result<Submission, ServiceError> {
        self.apply(id, ReviewField::FinalStatus, FieldValue::Status(status), actor, None)
            .await
    }

    /// Resubmit a rejected request with edited fields
    pub async fn resubmit(
        &self,
        id: &SubmissionId,
        actor: &ActorIdentity,
        fields: RequestFields,
    ) -> Result<Resubmission, ServiceError> {
        self.with_record_lock(id, async {
            let all = self.store.list_all().await?;
            let current = all
                .iter()
                .find(|s| &s.id == id)
                .cloned()
                .ok_or_else(|| ServiceError::NotFound(id.clone()))?;

            let outcome = resubmit(&current, &all, actor, fields, Utc::now())?;
            let saved = match outcome {
                Resubmission::ResetInPlace(updated) => {
                    Resubmission::ResetInPlace(self.commit(&current, updated).await?)
                }
                Resubmission::Superseded {
                    original,
                    replacement,
                } => {
                    // The original names its replacement before the replacement exists,
                    // so any later attempt on it is refused even across services
                    let original = self.commit(&current, original).await?;
                    self.store.upsert(replacement.clone()).await?;
                    Resubmission::Superseded {
                        original,
                        replacement,
                    }
                }
            };

            info!(
                submission.id = %id,
                active.id = %saved.active().id,
                new_record = saved.is_new_record(),
                "Resubmission stored"
            );
            Ok::<Resubmission, ServiceError>(saved)
        })
        .await
    }

    /// Delete a request. Restricted to the roles that decide final status.
    pub async fn remove(&self, id: &SubmissionId, actor: &ActorIdentity) -> Result<bool, ServiceError> {
        if !self.machine.policy().is_approver(actor.role) {
            return Err(ApprovalError::Unauthorized {
                actor: actor.username.clone(),
                action: format!("remove submission {}", id),
            }
            .into());
        }
        self.with_record_lock(id, async {
            let removed = self.store.remove(id).await?;
            if removed {
                info!(submission.id = %id, actor = %actor.username, "Submission removed");
            }
            Ok::<bool, ServiceError>(removed)
        })
        .await
    }

    /// Project finally approved submissions into the summary table on disk
    pub async fn sync_summary(&self, summary_path: &Path) -> Result<usize, ServiceError> {
        let submissions = self.store.list_all().await?;
        let added = SummaryProjection::update(summary_path, move |table| {
            let added = table.sync(&submissions);
            Ok((added, added > 0))
        })
        .await?;
        Ok(added)
    }
}
