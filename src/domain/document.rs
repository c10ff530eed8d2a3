use std::fmt;

use borsh::BorshSerialize;
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{Config, StepData, StepName, Steps};

/// Opaque, immutable identifier of a permit.
///
/// New permits are identified by a random UUID, but any string read from
/// storage is accepted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermitId(String);

impl PermitId {
    /// Generate a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PermitId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PermitId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for PermitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coarse-grained lifecycle status of a permit.
///
/// `Draft → Submitted` is performed by the workflow. `Approved` is set by an
/// external approval process; such documents are carried unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Being filled in; step data may change.
    #[default]
    Draft,
    /// Handed over for approval; step data is frozen.
    Submitted,
    /// Approved by the external approval process.
    Approved,
}

impl Status {
    /// Whether step data may still be edited.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Draft)
    }

    /// The status after submission, or `None` if the permit is already past
    /// the draft stage.
    #[must_use]
    pub const fn on_submit(self) -> Option<Self> {
        match self {
            Self::Draft => Some(Self::Submitted),
            Self::Submitted | Self::Approved => None,
        }
    }

    /// The serialized form of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A permit-to-work document.
///
/// Documents are values: every change produces a new document and leaves
/// the original untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitDocument {
    pub(crate) permit_id: PermitId,
    #[serde(default)]
    pub(crate) certificate_no: String,
    #[serde(default)]
    pub(crate) permit_no: String,
    #[serde(default)]
    pub(crate) status: Status,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    #[serde(default)]
    pub(crate) step_data: Steps,
}

impl PermitDocument {
    /// A new draft with every step populated from its template.
    ///
    /// Certificate and permit numbers are derived from the configured
    /// prefixes, today's date and the new identifier.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::new_at(config, Utc::now(), Local::now().naive_local())
    }

    pub(crate) fn new_at(config: &Config, created_at: DateTime<Utc>, local: NaiveDateTime) -> Self {
        let permit_id = PermitId::generate();
        let serial = serial(&permit_id, local);

        Self {
            certificate_no: format!("{}-{serial}", config.certificate_prefix()),
            permit_no: format!("{}-{serial}", config.permit_prefix()),
            permit_id,
            status: Status::Draft,
            created_at,
            updated_at: created_at,
            step_data: Steps::template(local),
        }
    }

    /// The permit's unique identifier.
    #[must_use]
    pub const fn permit_id(&self) -> &PermitId {
        &self.permit_id
    }

    /// The certificate number.
    #[must_use]
    pub fn certificate_no(&self) -> &str {
        &self.certificate_no
    }

    /// The permit number.
    #[must_use]
    pub fn permit_no(&self) -> &str {
        &self.permit_no
    }

    /// The lifecycle status.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// When the document was created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the document was last changed.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// The data of every step.
    #[must_use]
    pub const fn step_data(&self) -> &Steps {
        &self.step_data
    }

    /// A copy of the data of the named step.
    #[must_use]
    pub fn step(&self, step: StepName) -> StepData {
        self.step_data.get(step)
    }

    /// A new document with one step replaced.
    ///
    /// The step replaced is the one the data belongs to. Identity, status and
    /// every other step are carried over unchanged; `updated_at` is
    /// refreshed and never moves backwards.
    #[must_use]
    pub fn with_step_data(&self, data: impl Into<StepData>) -> Self {
        let mut document = self.touched();
        document.step_data.set(data.into());
        document
    }

    /// A new document with the given status.
    #[must_use]
    pub(crate) fn with_status(&self, status: Status) -> Self {
        let mut document = self.touched();
        document.status = status;
        document
    }

    fn touched(&self) -> Self {
        Self {
            updated_at: self.updated_at.max(Utc::now()),
            ..self.clone()
        }
    }

    /// Returns a value generated by hashing the step data.
    ///
    /// Any change to any step changes the fingerprint, so recording it in the
    /// audit trail shows whether content changed between two saves.
    ///
    /// # Panics
    ///
    /// Panics if borsh serialization fails (which should never happen for this
    /// data structure).
    #[must_use]
    pub fn fingerprint(&self) -> String {
        // encode using [borsh](https://borsh.io/)
        let encoded = borsh::to_vec(&self.step_data).expect("this should never fail");

        let hash = Sha256::digest(encoded);

        format!("{hash:x}")
    }
}

/// `YYYYMMDD-XXXX`, where `XXXX` is taken from the identifier.
fn serial(permit_id: &PermitId, local: NaiveDateTime) -> String {
    let suffix: String = permit_id
        .as_str()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(4)
        .collect::<String>()
        .to_ascii_uppercase();
    format!("{}-{suffix}", local.format("%Y%m%d"))
}
