// Form Approval Library - multi-stage review of access request forms
// This exposes the core components for testing and integration

pub mod approval;
pub mod cli;
pub mod config;
pub mod queries;
pub mod service;
pub mod store;
pub mod summary;
pub mod telemetry;

// Re-export key types for easy access
pub use approval::{
    ActorIdentity, ApprovalError, ApprovalMachine, FieldValue, RequestFields, Resubmission,
    ReviewField, ReviewStatus, ReviewerPolicy, Role, Stage, Submission, SubmissionId,
};
pub use config::{config, init_config, FormApprovalConfig};
pub use queries::{StageFilter, StatusCounts};
pub use service::{ReviewService, ServiceError};
pub use store::{InMemoryStore, JsonFileStore, StoreError, SubmissionStore};
pub use summary::{SummaryError, SummaryProjection, SummaryRow};
pub use telemetry::{create_review_span, generate_correlation_id, init_telemetry, shutdown_telemetry};
