use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The workflow action an audit event records.
///
/// Serialized as a `snake_case` string. Actions written by other tools are
/// preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuditAction {
    /// A new permit was created.
    PermitCreated,
    /// The workflow moved forward past a valid step.
    StepAdvanced,
    /// A step's data was replaced.
    StepUpdated,
    /// The draft was saved.
    DraftSaved,
    /// The permit was submitted.
    PermitSubmitted,
    /// An action this crate does not know about.
    Other(String),
}

impl AuditAction {
    /// The serialized form of the action.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::PermitCreated => "permit_created",
            Self::StepAdvanced => "step_advanced",
            Self::StepUpdated => "step_updated",
            Self::DraftSaved => "draft_saved",
            Self::PermitSubmitted => "permit_submitted",
            Self::Other(action) => action,
        }
    }
}

impl From<String> for AuditAction {
    fn from(value: String) -> Self {
        match value.as_str() {
            "permit_created" => Self::PermitCreated,
            "step_advanced" => Self::StepAdvanced,
            "step_updated" => Self::StepUpdated,
            "draft_saved" => Self::DraftSaved,
            "permit_submitted" => Self::PermitSubmitted,
            _ => Self::Other(value),
        }
    }
}

impl From<AuditAction> for String {
    fn from(action: AuditAction) -> Self {
        match action {
            AuditAction::Other(action) => action,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable, timestamped record of a workflow action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    id: String,
    ts: DateTime<Utc>,
    action: AuditAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl AuditEvent {
    /// Record an action now.
    #[must_use]
    pub fn new(action: AuditAction, details: Option<serde_json::Value>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ts: Utc::now(),
            action,
            details,
        }
    }

    /// Unique identifier of the event.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When the action happened.
    #[must_use]
    pub const fn ts(&self) -> DateTime<Utc> {
        self.ts
    }

    /// The action recorded.
    #[must_use]
    pub const fn action(&self) -> &AuditAction {
        &self.action
    }

    /// Structured details of the action, if any.
    #[must_use]
    pub const fn details(&self) -> Option<&serde_json::Value> {
        self.details.as_ref()
    }
}
