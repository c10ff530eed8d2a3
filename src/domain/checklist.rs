use borsh::BorshSerialize;
use serde::{Deserialize, Serialize};

/// The answer recorded against a checklist activity.
///
/// Serialized as `"yes"`, `"na"` or `""`. Any other stored value reads back
/// as [`Answer::Unanswered`] so that it is caught by validation instead of
/// failing the whole document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize)]
#[serde(from = "String", into = "String")]
pub enum Answer {
    /// The activity has been carried out.
    Yes,
    /// The activity does not apply to this job.
    NotApplicable,
    /// No answer has been given yet.
    #[default]
    Unanswered,
}

impl Answer {
    /// The serialized form of the answer.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::NotApplicable => "na",
            Self::Unanswered => "",
        }
    }
}

impl From<String> for Answer {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "yes" => Self::Yes,
            "na" | "n/a" => Self::NotApplicable,
            _ => Self::Unanswered,
        }
    }
}

impl From<Answer> for String {
    fn from(answer: Answer) -> Self {
        answer.as_str().to_string()
    }
}

/// A single activity in a safety checklist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChecklistItem {
    /// 1-based sequence number, unique within the checklist.
    pub id: u32,
    /// Fixed description of the activity.
    pub activity: String,
    /// The recorded answer.
    pub answer: Answer,
    /// Optional free text remarks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl ChecklistItem {
    /// Whether the item has been answered.
    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.answer != Answer::Unanswered
    }
}

/// Activities confirmed before the line is declared dead.
pub const DE_ENERGIZATION: [&str; 12] = [
    "Obtain line clear from the controlling load dispatch centre",
    "Open the circuit breaker at the sending end",
    "Open the circuit breaker at the receiving end",
    "Open the line isolators at both ends",
    "Lock the operating mechanism of breakers and isolators",
    "Attach caution boards to all isolation points",
    "Verify absence of voltage with an approved tester",
    "Close the line earth switches at both ends",
    "Apply portable earths at the work location",
    "Discharge any residual capacitive charge",
    "Isolate auxiliary and control supplies",
    "Record isolation points in the switching log",
];

/// Activities confirmed at the work location before work starts.
pub const PRE_EXECUTION: [&str; 5] = [
    "Brief the work party on the scope and hazards of the job",
    "Check personal protective equipment for every member of the work party",
    "Confirm portable earths are in place on both sides of the work zone",
    "Barricade the work zone and post danger boards",
    "Inspect tools, ladders and lifting equipment",
];

/// Activities confirmed before supply is restored.
pub const RE_ENERGIZATION: [&str; 14] = [
    "Confirm all permits on the line have been cancelled",
    "Confirm the work party has withdrawn from the work location",
    "Remove portable earths from the work location",
    "Account for every portable earth issued",
    "Remove tools and materials from the line and structures",
    "Remove barricades and danger boards",
    "Open the line earth switches at both ends",
    "Remove locks from breaker and isolator mechanisms",
    "Remove caution boards from isolation points",
    "Restore auxiliary and control supplies",
    "Close the line isolators at both ends",
    "Inform the controlling load dispatch centre",
    "Close the circuit breaker on instruction",
    "Record restoration in the switching log",
];

/// Builds an unanswered checklist from a list of activities.
#[must_use]
pub fn template(activities: &[&str]) -> Vec<ChecklistItem> {
    (1..)
        .zip(activities)
        .map(|(id, activity)| ChecklistItem {
            id,
            activity: (*activity).to_string(),
            answer: Answer::Unanswered,
            remarks: None,
        })
        .collect()
}
