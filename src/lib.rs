//! Permit-to-work workflow and validation engine
//!
//! A permit is a multi-step document. Each step is checked against its own
//! schema, forward navigation is gated on the current step validating, and
//! submission revalidates the whole document. Drafts are persisted together
//! with an append-only audit trail.

pub mod domain;
pub use domain::{
    AuditAction, AuditEvent, Config, Namespace, PermitDocument, PermitId, Status, StepData,
    StepName, Steps,
};

/// Step schemas and the evaluator that checks step data against them.
pub mod validation;
pub use validation::{ErrorKind, ErrorList, Issue, validate, validate_document, validate_step};

/// Key-value storage of permit drafts and their audit trails.
pub mod storage;
pub use storage::{
    DirectoryStore, DraftStore, Envelope, KeyValueStore, LoadError, MemoryStore, StoreError,
};

/// The workflow controller driving navigation, save and submit.
pub mod workflow;
pub use workflow::{Submission, Workflow, WorkflowError};
