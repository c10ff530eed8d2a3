//! Validation of step data against the step schemas.
//!
//! Every step has a [`Schema`] describing its fields and cross-field rules.
//! Evaluation is pure: data is never modified, and the same data always
//! produces the same result.

use std::{collections::BTreeMap, fmt};

use nonempty::NonEmpty;

use crate::domain::{PermitDocument, StepData, StepName, Steps};

mod primitive;
pub use primitive::Primitive;

mod schema;
pub use schema::{Cardinality, Schema};

mod steps;

/// Whether an issue concerns a single field or a rule across fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A single field failed a primitive or structural rule.
    Field,
    /// A rule spanning several fields failed.
    CrossField,
}

/// A single failed rule, addressed by field path.
///
/// Paths use `.` between nested fields and `[i]` for list items, e.g.
/// `authorizations[1].contactNo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    path: String,
    message: String,
    kind: ErrorKind,
}

impl Issue {
    /// A field-level issue.
    #[must_use]
    pub fn field(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind: ErrorKind::Field,
        }
    }

    /// A cross-field issue.
    #[must_use]
    pub fn cross_field(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind: ErrorKind::CrossField,
        }
    }

    /// Path of the offending field.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Human readable description of the problem.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The kind of rule that failed.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Moves the issue under a parent field.
    pub(crate) fn under(mut self, parent: &str) -> Self {
        self.path = if self.path.is_empty() {
            parent.to_string()
        } else if self.path.starts_with('[') {
            format!("{parent}{}", self.path)
        } else {
            format!("{parent}.{}", self.path)
        };
        self
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// The issues found in one step, at most one per field path.
///
/// An error list is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorList(NonEmpty<Issue>);

impl ErrorList {
    /// Collects issues into a list, keeping the first issue for each path.
    ///
    /// Returns `None` if there are no issues.
    #[must_use]
    pub fn from_issues(issues: impl IntoIterator<Item = Issue>) -> Option<Self> {
        let mut unique: Vec<Issue> = Vec::new();
        for issue in issues {
            if !unique.iter().any(|seen| seen.path == issue.path) {
                unique.push(issue);
            }
        }
        NonEmpty::from_vec(unique).map(Self)
    }

    /// The issue recorded against a path, if any.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Issue> {
        self.0.iter().find(|issue| issue.path == path)
    }

    /// The message recorded against a path, if any.
    #[must_use]
    pub fn message(&self, path: &str) -> Option<&str> {
        self.get(path).map(Issue::message)
    }

    /// Whether an issue is recorded against the path.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// The first issue found.
    #[must_use]
    pub fn first(&self) -> &Issue {
        self.0.first()
    }

    /// Iterate over the issues in the order they were found.
    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.0.iter()
    }

    /// The number of issues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for symmetry with [`Self::len`].
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// The issues as a map from path to message.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.iter()
            .map(|issue| (issue.path.clone(), issue.message.clone()))
            .collect()
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

/// Validate the data of a single step against that step's schema.
///
/// # Errors
///
/// Returns the issues found if the data does not satisfy the schema.
pub fn validate(data: &StepData) -> Result<(), ErrorList> {
    match data {
        StepData::Basic(section) => steps::BASIC.evaluate(section),
        StepData::WorkAuth(section) => steps::WORK_AUTH.evaluate(section),
        StepData::DeEnergize(section) => steps::DE_ENERGIZE.evaluate(section),
        StepData::PermitToWork(section) => steps::PERMIT_TO_WORK.evaluate(section),
        StepData::PreExecution(section) => steps::PRE_EXECUTION.evaluate(section),
        StepData::JobCompletion(section) => steps::JOB_COMPLETION.evaluate(section),
        StepData::ReEnergizeInstruction(section) => {
            steps::RE_ENERGIZE_INSTRUCTION.evaluate(section)
        }
        StepData::ReEnergizeAuthorization(section) => {
            steps::RE_ENERGIZE_AUTHORIZATION.evaluate(section)
        }
    }
}

/// Validate the named step of a set of step data, without copying it.
///
/// # Errors
///
/// Returns the issues found if the step does not satisfy its schema.
pub fn validate_step(step: StepName, data: &Steps) -> Result<(), ErrorList> {
    match step {
        StepName::Basic => steps::BASIC.evaluate(&data.basic),
        StepName::WorkAuth => steps::WORK_AUTH.evaluate(&data.work_auth),
        StepName::DeEnergize => steps::DE_ENERGIZE.evaluate(&data.de_energize),
        StepName::PermitToWork => steps::PERMIT_TO_WORK.evaluate(&data.permit_to_work),
        StepName::PreExecution => steps::PRE_EXECUTION.evaluate(&data.pre_execution),
        StepName::JobCompletion => steps::JOB_COMPLETION.evaluate(&data.job_completion),
        StepName::ReEnergizeInstruction => {
            steps::RE_ENERGIZE_INSTRUCTION.evaluate(&data.re_energize_instruction)
        }
        StepName::ReEnergizeAuthorization => {
            steps::RE_ENERGIZE_AUTHORIZATION.evaluate(&data.re_energize_authorization)
        }
    }
}

/// Validate every step of a document.
///
/// # Errors
///
/// Returns the issues of every failing step, keyed by step.
pub fn validate_document(document: &PermitDocument) -> Result<(), BTreeMap<StepName, ErrorList>> {
    let failures: BTreeMap<_, _> = StepName::ALL
        .into_iter()
        .filter_map(|step| {
            validate_step(step, document.step_data())
                .err()
                .map(|errors| (step, errors))
        })
        .collect();

    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issues_nest_under_parents() {
        let issue = Issue::field("name", "too short").under("authorizations[0]");
        assert_eq!(issue.path(), "authorizations[0].name");

        let issue = Issue::field("[3].answer", "unanswered").under("checklist");
        assert_eq!(issue.path(), "checklist[3].answer");

        let issue = Issue::cross_field("", "out of order").under("validity");
        assert_eq!(issue.path(), "validity");
        assert_eq!(issue.kind(), ErrorKind::CrossField);
    }

    #[test]
    fn error_list_keeps_first_issue_per_path() {
        let list = ErrorList::from_issues([
            Issue::field("name", "required"),
            Issue::field("name", "too short"),
            Issue::field("date", "bad date"),
        ])
        .unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list.message("name"), Some("required"));
        assert_eq!(list.first().path(), "name");
        assert_eq!(list.to_string(), "name: required; date: bad date");
    }

    #[test]
    fn no_issues_is_no_error_list() {
        assert!(ErrorList::from_issues(Vec::new()).is_none());
    }
}
