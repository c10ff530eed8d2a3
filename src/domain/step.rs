use std::{fmt, str::FromStr};

use borsh::BorshSerialize;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::sections::{
    BasicDetails, DeEnergization, JobCompletion, PermitToWork, PreExecution,
    ReEnergizeAuthorization, ReEnergizeInstruction, WorkAuthorization,
};

/// The eight fixed steps of a permit, in workflow order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum StepName {
    /// Basic details of the job.
    Basic,
    /// Work authorization by requester and approver.
    WorkAuth,
    /// De-energization of the line.
    DeEnergize,
    /// Issue of the permit to work.
    PermitToWork,
    /// Checks before execution.
    PreExecution,
    /// Completion of the job.
    JobCompletion,
    /// Instruction to re-energize.
    ReEnergizeInstruction,
    /// Authorization to re-energize.
    ReEnergizeAuthorization,
}

impl StepName {
    /// Every step, in workflow order.
    pub const ALL: [Self; 8] = [
        Self::Basic,
        Self::WorkAuth,
        Self::DeEnergize,
        Self::PermitToWork,
        Self::PreExecution,
        Self::JobCompletion,
        Self::ReEnergizeInstruction,
        Self::ReEnergizeAuthorization,
    ];

    /// The first step.
    pub const FIRST: Self = Self::Basic;

    /// The last step.
    pub const LAST: Self = Self::ReEnergizeAuthorization;

    /// Zero-based position of the step in the workflow.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The step at the given position, if any.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The following step, or `None` on the last step.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    /// The preceding step, or `None` on the first step.
    #[must_use]
    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    /// The key the step's data is stored under.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::WorkAuth => "workAuth",
            Self::DeEnergize => "deEnergize",
            Self::PermitToWork => "permitToWork",
            Self::PreExecution => "preExecution",
            Self::JobCompletion => "jobCompletion",
            Self::ReEnergizeInstruction => "reEnergizeInstruction",
            Self::ReEnergizeAuthorization => "reEnergizeAuthorization",
        }
    }

    /// Human readable title of the step.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Basic => "Basic Details",
            Self::WorkAuth => "Work Authorization",
            Self::DeEnergize => "De-Energization",
            Self::PermitToWork => "Permit to Work",
            Self::PreExecution => "Pre-Execution",
            Self::JobCompletion => "Job Completion",
            Self::ReEnergizeInstruction => "Re-Energize Instruction",
            Self::ReEnergizeAuthorization => "Re-Energize Authorization",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for StepName {
    type Err = UnknownStepError;

    /// Accepts the storage key in any case, with or without separators
    /// (`workAuth`, `work-auth`, `WORK_AUTH`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let squashed: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect();
        Self::ALL
            .into_iter()
            .find(|step| step.key().eq_ignore_ascii_case(&squashed))
            .ok_or_else(|| UnknownStepError(s.to_string()))
    }
}

/// Error returned when a string does not name a step.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown step '{0}'")]
pub struct UnknownStepError(String);

/// The data of a single step, tagged with the step it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepData {
    /// Basic details.
    Basic(BasicDetails),
    /// Work authorization.
    WorkAuth(WorkAuthorization),
    /// De-energization.
    DeEnergize(DeEnergization),
    /// Permit to work.
    PermitToWork(PermitToWork),
    /// Pre-execution checks.
    PreExecution(PreExecution),
    /// Job completion.
    JobCompletion(JobCompletion),
    /// Re-energize instruction.
    ReEnergizeInstruction(ReEnergizeInstruction),
    /// Re-energize authorization.
    ReEnergizeAuthorization(ReEnergizeAuthorization),
}

impl StepData {
    /// The step this data belongs to.
    #[must_use]
    pub const fn name(&self) -> StepName {
        match self {
            Self::Basic(_) => StepName::Basic,
            Self::WorkAuth(_) => StepName::WorkAuth,
            Self::DeEnergize(_) => StepName::DeEnergize,
            Self::PermitToWork(_) => StepName::PermitToWork,
            Self::PreExecution(_) => StepName::PreExecution,
            Self::JobCompletion(_) => StepName::JobCompletion,
            Self::ReEnergizeInstruction(_) => StepName::ReEnergizeInstruction,
            Self::ReEnergizeAuthorization(_) => StepName::ReEnergizeAuthorization,
        }
    }

    /// Interprets a structured value as the data of the given step.
    ///
    /// Unknown fields are ignored and missing fields take their empty
    /// defaults, so any object is accepted; only values of the wrong type
    /// are rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not have the shape of the step's
    /// data.
    pub fn from_value(step: StepName, value: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match step {
            StepName::Basic => Self::Basic(serde_json::from_value(value)?),
            StepName::WorkAuth => Self::WorkAuth(serde_json::from_value(value)?),
            StepName::DeEnergize => Self::DeEnergize(serde_json::from_value(value)?),
            StepName::PermitToWork => Self::PermitToWork(serde_json::from_value(value)?),
            StepName::PreExecution => Self::PreExecution(serde_json::from_value(value)?),
            StepName::JobCompletion => Self::JobCompletion(serde_json::from_value(value)?),
            StepName::ReEnergizeInstruction => {
                Self::ReEnergizeInstruction(serde_json::from_value(value)?)
            }
            StepName::ReEnergizeAuthorization => {
                Self::ReEnergizeAuthorization(serde_json::from_value(value)?)
            }
        })
    }
}

macro_rules! impl_from_section {
    ($($variant:ident($section:ty)),* $(,)?) => {
        $(
            impl From<$section> for StepData {
                fn from(section: $section) -> Self {
                    Self::$variant(section)
                }
            }
        )*
    };
}

impl_from_section!(
    Basic(BasicDetails),
    WorkAuth(WorkAuthorization),
    DeEnergize(DeEnergization),
    PermitToWork(PermitToWork),
    PreExecution(PreExecution),
    JobCompletion(JobCompletion),
    ReEnergizeInstruction(ReEnergizeInstruction),
    ReEnergizeAuthorization(ReEnergizeAuthorization),
);

/// The data of all eight steps, keyed by step name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Steps {
    /// Basic details.
    pub basic: BasicDetails,
    /// Work authorization.
    pub work_auth: WorkAuthorization,
    /// De-energization.
    pub de_energize: DeEnergization,
    /// Permit to work.
    pub permit_to_work: PermitToWork,
    /// Pre-execution checks.
    pub pre_execution: PreExecution,
    /// Job completion.
    pub job_completion: JobCompletion,
    /// Re-energize instruction.
    pub re_energize_instruction: ReEnergizeInstruction,
    /// Re-energize authorization.
    pub re_energize_authorization: ReEnergizeAuthorization,
}

impl Steps {
    /// Every step pre-populated from its template, dated `now`.
    #[must_use]
    pub fn template(now: NaiveDateTime) -> Self {
        Self {
            basic: BasicDetails::template(now),
            work_auth: WorkAuthorization::template(now),
            de_energize: DeEnergization::template(now),
            permit_to_work: PermitToWork::template(now),
            pre_execution: PreExecution::template(now),
            job_completion: JobCompletion::template(now),
            re_energize_instruction: ReEnergizeInstruction::template(now),
            re_energize_authorization: ReEnergizeAuthorization::template(now),
        }
    }

    /// A copy of the data of the named step.
    #[must_use]
    pub fn get(&self, step: StepName) -> StepData {
        match step {
            StepName::Basic => self.basic.clone().into(),
            StepName::WorkAuth => self.work_auth.clone().into(),
            StepName::DeEnergize => self.de_energize.clone().into(),
            StepName::PermitToWork => self.permit_to_work.clone().into(),
            StepName::PreExecution => self.pre_execution.clone().into(),
            StepName::JobCompletion => self.job_completion.clone().into(),
            StepName::ReEnergizeInstruction => self.re_energize_instruction.clone().into(),
            StepName::ReEnergizeAuthorization => self.re_energize_authorization.clone().into(),
        }
    }

    /// Replaces the step the data belongs to.
    pub(crate) fn set(&mut self, data: StepData) {
        match data {
            StepData::Basic(section) => self.basic = section,
            StepData::WorkAuth(section) => self.work_auth = section,
            StepData::DeEnergize(section) => self.de_energize = section,
            StepData::PermitToWork(section) => self.permit_to_work = section,
            StepData::PreExecution(section) => self.pre_execution = section,
            StepData::JobCompletion(section) => self.job_completion = section,
            StepData::ReEnergizeInstruction(section) => self.re_energize_instruction = section,
            StepData::ReEnergizeAuthorization(section) => {
                self.re_energize_authorization = section;
            }
        }
    }
}
