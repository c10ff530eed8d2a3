//! Each workflow step owns one of these structures.
//!
//! `Default` gives an empty section (used when stored data is missing a
//! field); `template` gives the pre-populated section a new permit starts
//! with.

use borsh::BorshSerialize;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{
    checklist::{self, ChecklistItem},
    field::{DATE_FORMAT, DateTimeRange, KnownRole, SignatureData, TIME_FORMAT},
};

/// Default validity of a new permit, in hours.
const DEFAULT_VALIDITY_HOURS: i64 = 8;

fn signers(roles: &[KnownRole], at: NaiveDateTime) -> Vec<SignatureData> {
    roles
        .iter()
        .map(|role| SignatureData::blank(*role, at))
        .collect()
}

/// Identification of the job and the equipment it affects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BasicDetails {
    /// The power line the work is carried out on.
    pub power_line: String,
    /// Plant affected by the outage.
    pub affected_plant: String,
    /// Description of the job.
    pub job_description: String,
    /// Number of a related permit, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_reference_permit_no: Option<String>,
    /// Where the work takes place.
    pub location: String,
    /// The period the permit is valid for.
    pub validity: DateTimeRange,
}

impl BasicDetails {
    /// Empty details valid for the default period starting at `now`.
    #[must_use]
    pub fn template(now: NaiveDateTime) -> Self {
        Self {
            validity: DateTimeRange::starting_at(now, DEFAULT_VALIDITY_HOURS),
            ..Self::default()
        }
    }
}

/// Authorization of the work by the requester and the approver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkAuthorization {
    /// Exactly two signers: the requester, then the approver.
    pub authorizations: Vec<SignatureData>,
    /// The signers confirm the details above are correct.
    pub confirmed: bool,
}

impl WorkAuthorization {
    /// The fixed signer roles, in order.
    pub const ROLES: [KnownRole; 2] = [KnownRole::Requester, KnownRole::Approver];

    /// Unsigned authorization blocks for the fixed roles.
    #[must_use]
    pub fn template(now: NaiveDateTime) -> Self {
        Self {
            authorizations: signers(&Self::ROLES, now),
            confirmed: false,
        }
    }
}

/// Isolation and earthing of the line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeEnergization {
    /// The de-energization checklist.
    pub checklist: Vec<ChecklistItem>,
    /// Signers attesting the isolation.
    pub authorizations: Vec<SignatureData>,
    /// The line is confirmed isolated and earthed.
    pub confirmed: bool,
}

impl DeEnergization {
    /// The unanswered checklist and an unsigned operator block.
    #[must_use]
    pub fn template(now: NaiveDateTime) -> Self {
        Self {
            checklist: checklist::template(&checklist::DE_ENERGIZATION),
            authorizations: signers(&[KnownRole::Operator], now),
            confirmed: false,
        }
    }
}

/// Issue of the permit to the work party.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PermitToWork {
    /// Name of the person leading the work party.
    pub work_party_leader: String,
    /// Number of people in the work party.
    pub work_party_size: u32,
    /// Where portable earths are applied.
    pub earthing_points: String,
    /// Signers issuing the permit.
    pub authorizations: Vec<SignatureData>,
    /// The issuer confirms the location is safe to work on.
    pub safety_confirmed: bool,
}

impl PermitToWork {
    /// An unsigned permit holder block.
    #[must_use]
    pub fn template(now: NaiveDateTime) -> Self {
        Self {
            work_party_size: 1,
            authorizations: signers(&[KnownRole::PermitHolder], now),
            ..Self::default()
        }
    }
}

/// Checks made at the work location before starting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreExecution {
    /// The pre-execution checklist.
    pub checklist: Vec<ChecklistItem>,
    /// At least two signers.
    pub authorizations: Vec<SignatureData>,
    /// The checks are confirmed complete.
    pub confirmed: bool,
}

impl PreExecution {
    /// The unanswered checklist with permit holder and safety officer blocks.
    #[must_use]
    pub fn template(now: NaiveDateTime) -> Self {
        Self {
            checklist: checklist::template(&checklist::PRE_EXECUTION),
            authorizations: signers(&[KnownRole::PermitHolder, KnownRole::SafetyOfficer], now),
            confirmed: false,
        }
    }
}

/// Hand-back of the line once the job is done.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobCompletion {
    /// Date the job was completed (`YYYY-MM-DD`).
    pub completion_date: String,
    /// Time the job was completed (`HH:mm`).
    pub completion_time: String,
    /// Optional notes on the completed job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    /// Every member of the work party has withdrawn.
    pub workmen_withdrawn: bool,
    /// Tools and materials have been removed.
    pub tools_removed: bool,
    /// Portable earths have been removed.
    pub earths_removed: bool,
    /// The work area has been cleared.
    pub area_cleared: bool,
    /// Signers handing the line back.
    pub authorizations: Vec<SignatureData>,
}

impl JobCompletion {
    /// Completion stamped at `now` with an unsigned permit holder block.
    #[must_use]
    pub fn template(now: NaiveDateTime) -> Self {
        Self {
            completion_date: now.format(DATE_FORMAT).to_string(),
            completion_time: now.format(TIME_FORMAT).to_string(),
            authorizations: signers(&[KnownRole::PermitHolder], now),
            ..Self::default()
        }
    }
}

/// Instruction to restore supply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReEnergizeInstruction {
    /// The switching instructions for restoring supply.
    pub instructions: String,
    /// The permit to work has been cancelled.
    pub permit_cancelled: bool,
    /// All earths have been removed.
    pub earths_removed: bool,
    /// Everyone is clear of the line.
    pub personnel_clear: bool,
    /// Restoration has been approved by the control centre.
    pub restoration_approved: bool,
    /// Signers issuing the instruction.
    pub authorizations: Vec<SignatureData>,
}

impl ReEnergizeInstruction {
    /// An unsigned supervisor block.
    #[must_use]
    pub fn template(now: NaiveDateTime) -> Self {
        Self {
            authorizations: signers(&[KnownRole::Supervisor], now),
            ..Self::default()
        }
    }
}

/// Final authorization to re-energize the line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReEnergizeAuthorization {
    /// The re-energization checklist.
    pub checklist: Vec<ChecklistItem>,
    /// Signers authorizing restoration.
    pub authorizations: Vec<SignatureData>,
    /// The final go-ahead.
    pub final_confirmation: bool,
}

impl ReEnergizeAuthorization {
    /// The unanswered checklist and an unsigned approver block.
    #[must_use]
    pub fn template(now: NaiveDateTime) -> Self {
        Self {
            checklist: checklist::template(&checklist::RE_ENERGIZATION),
            authorizations: signers(&[KnownRole::Approver], now),
            final_confirmation: false,
        }
    }
}
