// Approval Module - Access Request Review Pipeline
//
// Pure state machine over submission records. Nothing in here touches storage;
// callers load a record, ask the machine for the next one, and persist it.

pub mod errors;
pub mod identity;
pub mod machine;
pub mod policy;
pub mod resubmission;
pub mod types;


pub use errors::{ApprovalError, MissingPrecondition};
pub use identity::{ActorIdentity, ParseRoleError, Role};
pub use machine::ApprovalMachine;
pub use policy::ReviewerPolicy;
pub use resubmission::{can_resubmit, find_resubmission, has_resubmission, resubmit, Resubmission};
pub use types::{
    ApprovedFile, FieldValue, FinalState, ParseStatusError, RequestFields, ReviewField,
    ReviewStatus, Stage, StageState, Submission, SubmissionId,
};
