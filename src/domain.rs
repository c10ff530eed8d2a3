//! Domain models for permit-to-work documents.
//!
//! This module contains the permit document, the data owned by each of its
//! steps, the reusable field value types, and configuration.

/// Reusable field value types (date/time ranges, signatures, roles).
pub mod field;
pub use field::{DateTimeRange, KnownRole, Role, SignatureData};

/// Fixed-length safety checklists and their static activity templates.
pub mod checklist;
pub use checklist::{Answer, ChecklistItem};

/// The per-step data structures.
pub mod sections;

/// Step names and the step data aggregate.
pub mod step;
pub use step::{StepData, StepName, Steps};

/// The permit document aggregate root.
pub mod document;
pub use document::{PermitDocument, PermitId, Status};

/// Audit events recorded against a permit.
pub mod audit;
pub use audit::{AuditAction, AuditEvent};

mod config;
pub use config::{Config, Namespace, NamespaceError};
