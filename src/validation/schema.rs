use std::fmt;

use super::{ErrorList, Issue, Primitive};
use crate::domain::ChecklistItem;

type FieldRule<T> = Box<dyn Fn(&T, &mut Vec<Issue>) + Send + Sync>;

struct Refinement<T> {
    path: &'static str,
    message: &'static str,
    holds: fn(&T) -> bool,
}

/// How many items a list must contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Exactly this many.
    Exactly(usize),
    /// This many or more.
    AtLeast(usize),
}

impl Cardinality {
    /// Whether a list of `len` items satisfies the constraint.
    #[must_use]
    pub const fn admits(self, len: usize) -> bool {
        match self {
            Self::Exactly(n) => len == n,
            Self::AtLeast(n) => len >= n,
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(n) => write!(f, "exactly {n}"),
            Self::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

/// A validation schema for values of type `T`.
///
/// A schema is a list of field rules followed by a list of refinements.
/// Field rules are checked independently and all their issues are reported.
/// Refinements relate several fields to each other and are only checked
/// once every field rule passes, so they can assume well-formed fields.
///
/// Nested schemas follow the same order internally: a nested value's
/// refinements count as field rules of the parent.
pub struct Schema<T> {
    fields: Vec<FieldRule<T>>,
    refinements: Vec<Refinement<T>>,
}

impl<T> Default for Schema<T> {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            refinements: Vec::new(),
        }
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("fields", &self.fields.len())
            .field(
                "refinements",
                &self.refinements.iter().map(|r| r.path).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<T: 'static> Schema<T> {
    /// An empty schema that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn rule(mut self, rule: impl Fn(&T, &mut Vec<Issue>) + Send + Sync + 'static) -> Self {
        self.fields.push(Box::new(rule));
        self
    }

    /// A text field checked by a primitive.
    ///
    /// Several primitives may be applied to the same field; only the first
    /// failure is reported.
    #[must_use]
    pub fn field(self, name: &'static str, get: fn(&T) -> &str, primitive: Primitive) -> Self {
        self.rule(move |value, issues| {
            if let Err(message) = primitive.check(get(value)) {
                issues.push(Issue::field(name, message));
            }
        })
    }

    /// An optional text field, checked by the primitive only when present.
    #[must_use]
    pub fn optional(
        self,
        name: &'static str,
        get: fn(&T) -> Option<&str>,
        primitive: Primitive,
    ) -> Self {
        self.rule(move |value, issues| {
            if let Some(Err(message)) = get(value).map(|text| primitive.check(text)) {
                issues.push(Issue::field(name, message));
            }
        })
    }

    /// A numeric field with a lower bound.
    #[must_use]
    pub fn at_least(self, name: &'static str, get: fn(&T) -> u32, min: u32) -> Self {
        self.rule(move |value, issues| {
            if get(value) < min {
                issues.push(Issue::field(name, format!("Must be at least {min}")));
            }
        })
    }

    /// A nested value checked by its own schema.
    ///
    /// Issues are reported under `name`; issues the nested schema reports
    /// against the value as a whole are reported at `name` itself.
    #[must_use]
    pub fn nested<U: 'static>(
        self,
        name: &'static str,
        get: fn(&T) -> &U,
        schema: Schema<U>,
    ) -> Self {
        self.rule(move |value, issues| {
            issues.extend(
                schema
                    .issues(get(value))
                    .into_iter()
                    .map(|issue| issue.under(name)),
            );
        })
    }

    /// A list whose items are each checked by a schema.
    ///
    /// Issues are reported under `name[i]`.
    #[must_use]
    pub fn each<U: 'static>(
        self,
        name: &'static str,
        get: fn(&T) -> &[U],
        schema: Schema<U>,
    ) -> Self {
        self.rule(move |value, issues| {
            for (i, item) in get(value).iter().enumerate() {
                let parent = format!("{name}[{i}]");
                issues.extend(
                    schema
                        .issues(item)
                        .into_iter()
                        .map(|issue| issue.under(&parent)),
                );
            }
        })
    }

    /// The number of items in a list.
    #[must_use]
    pub fn count<U: 'static>(
        self,
        name: &'static str,
        get: fn(&T) -> &[U],
        cardinality: Cardinality,
    ) -> Self {
        self.rule(move |value, issues| {
            let len = get(value).len();
            if !cardinality.admits(len) {
                issues.push(Issue::field(
                    name,
                    format!("Requires {cardinality} entries, found {len}"),
                ));
            }
        })
    }

    /// A checklist that must follow `activities` item for item, with every
    /// item answered.
    ///
    /// A checklist of the wrong length is reported at `name`. Otherwise the
    /// first item numbered out of sequence, the first item whose activity
    /// differs from the template and the first unanswered item are reported
    /// at `name[i].id`, `name[i].activity` and `name[i].answer`.
    #[must_use]
    pub fn checklist(
        self,
        name: &'static str,
        get: fn(&T) -> &[ChecklistItem],
        activities: &'static [&'static str],
    ) -> Self {
        self.rule(move |value, issues| {
            let items = get(value);
            if items.len() != activities.len() {
                issues.push(Issue::field(
                    name,
                    format!(
                        "Checklist must contain exactly {} items, found {}",
                        activities.len(),
                        items.len()
                    ),
                ));
                return;
            }

            if let Some(i) = (1..).zip(items).position(|(id, item)| item.id != id) {
                issues.push(Issue::field(
                    format!("{name}[{i}].id"),
                    format!("Expected item number {}", i + 1),
                ));
            }

            if let Some(i) = items
                .iter()
                .zip(activities)
                .position(|(item, activity)| item.activity != *activity)
            {
                issues.push(Issue::field(
                    format!("{name}[{i}].activity"),
                    format!("Expected activity '{}'", activities[i]),
                ));
            }

            if let Some(i) = items.iter().position(|item| !item.is_answered()) {
                issues.push(Issue::field(
                    format!("{name}[{i}].answer"),
                    "Answer every checklist item",
                ));
            }
        })
    }

    /// A custom field rule.
    #[must_use]
    pub fn check(self, check: impl Fn(&T) -> Option<Issue> + Send + Sync + 'static) -> Self {
        self.rule(move |value, issues| issues.extend(check(value)))
    }

    /// A cross-field rule, reported at `path` when `holds` is false.
    ///
    /// An empty path reports against the value as a whole.
    #[must_use]
    pub fn refine(
        mut self,
        path: &'static str,
        message: &'static str,
        holds: fn(&T) -> bool,
    ) -> Self {
        self.refinements.push(Refinement {
            path,
            message,
            holds,
        });
        self
    }

    /// Every issue found in the value.
    ///
    /// Refinements are only checked if no field rule reports an issue.
    #[must_use]
    pub fn issues(&self, value: &T) -> Vec<Issue> {
        let mut issues = Vec::new();
        for rule in &self.fields {
            rule(value, &mut issues);
        }
        if issues.is_empty() {
            issues.extend(
                self.refinements
                    .iter()
                    .filter(|refinement| !(refinement.holds)(value))
                    .map(|refinement| Issue::cross_field(refinement.path, refinement.message)),
            );
        }
        issues
    }

    /// Checks the value against the schema.
    ///
    /// # Errors
    ///
    /// Returns the issues found, at most one per path.
    pub fn evaluate(&self, value: &T) -> Result<(), ErrorList> {
        ErrorList::from_issues(self.issues(value)).map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::Answer, validation::ErrorKind};

    #[derive(Default)]
    struct Crew {
        leader: String,
        phone: Option<String>,
        shift: Shift,
        members: Vec<Member>,
        checklist: Vec<ChecklistItem>,
        briefed: bool,
    }

    #[derive(Default)]
    struct Shift {
        start: String,
        end: String,
    }

    struct Member {
        name: String,
    }

    fn shift() -> Schema<Shift> {
        Schema::<Shift>::new()
            .field("start", |s| s.start.as_str(), Primitive::Time)
            .field("end", |s| s.end.as_str(), Primitive::Time)
            .refine("", "Shift must end after it starts", |s| s.end > s.start)
    }

    fn crew() -> Schema<Crew> {
        Schema::<Crew>::new()
            .field("leader", |c| c.leader.as_str(), Primitive::Required)
            .field("leader", |c| c.leader.as_str(), Primitive::MinLength(2))
            .optional("phone", |c| c.phone.as_deref(), Primitive::Phone)
            .nested("shift", |c| &c.shift, shift())
            .count("members", |c| c.members.as_slice(), Cardinality::AtLeast(2))
            .each(
                "members",
                |c| c.members.as_slice(),
                Schema::<Member>::new().field("name", |m| m.name.as_str(), Primitive::Required),
            )
            .checklist("checklist", |c| c.checklist.as_slice(), &ACTIVITIES)
            .refine("briefed", "The crew must be briefed", |c| c.briefed)
    }

    const ACTIVITIES: [&str; 2] = ["Test the harness", "Sign the tool log"];

    fn answered(id: u32) -> ChecklistItem {
        ChecklistItem {
            id,
            activity: ACTIVITIES[id as usize - 1].to_string(),
            answer: Answer::Yes,
            remarks: None,
        }
    }

    fn valid_crew() -> Crew {
        Crew {
            leader: "Asha".to_string(),
            phone: None,
            shift: Shift {
                start: "08:00".to_string(),
                end: "16:00".to_string(),
            },
            members: vec![
                Member {
                    name: "Ravi".to_string(),
                },
                Member {
                    name: "Mei".to_string(),
                },
            ],
            checklist: vec![answered(1), answered(2)],
            briefed: true,
        }
    }

    #[test]
    fn valid_value_passes() {
        assert_eq!(crew().evaluate(&valid_crew()), Ok(()));
    }

    #[test]
    fn field_rules_report_every_failing_field() {
        let value = Crew {
            leader: String::new(),
            phone: Some("nope".to_string()),
            ..valid_crew()
        };

        let errors = crew().evaluate(&value).unwrap_err();

        assert_eq!(errors.message("leader"), Some("This field is required"));
        assert!(errors.contains("phone"));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn refinements_wait_for_valid_fields() {
        let value = Crew {
            leader: String::new(),
            briefed: false,
            ..valid_crew()
        };
        let errors = crew().evaluate(&value).unwrap_err();
        assert!(!errors.contains("briefed"));

        let value = Crew {
            briefed: false,
            ..valid_crew()
        };
        let errors = crew().evaluate(&value).unwrap_err();
        let issue = errors.get("briefed").unwrap();
        assert_eq!(issue.kind(), ErrorKind::CrossField);
    }

    #[test]
    fn nested_refinement_reports_at_the_nested_field() {
        let value = Crew {
            shift: Shift {
                start: "16:00".to_string(),
                end: "08:00".to_string(),
            },
            ..valid_crew()
        };

        let errors = crew().evaluate(&value).unwrap_err();
        let issue = errors.get("shift").unwrap();
        assert_eq!(issue.kind(), ErrorKind::CrossField);
        assert_eq!(issue.message(), "Shift must end after it starts");
    }

    #[test]
    fn list_items_are_indexed() {
        let mut value = valid_crew();
        value.members[1].name = " ".to_string();

        let errors = crew().evaluate(&value).unwrap_err();
        assert!(errors.contains("members[1].name"));
    }

    #[test]
    fn cardinality_is_checked() {
        let mut value = valid_crew();
        value.members.truncate(1);

        let errors = crew().evaluate(&value).unwrap_err();
        assert_eq!(
            errors.message("members"),
            Some("Requires at least 2 entries, found 1")
        );
    }

    #[test]
    fn checklist_reports_first_unanswered_item() {
        let mut value = valid_crew();
        value.checklist = vec![answered(1), answered(2)];
        value.checklist[1].answer = Answer::Unanswered;

        let errors = crew().evaluate(&value).unwrap_err();
        assert!(errors.contains("checklist[1].answer"));
    }

    #[test]
    fn checklist_length_is_structural() {
        let mut value = valid_crew();
        value.checklist = vec![answered(1)];

        let errors = crew().evaluate(&value).unwrap_err();
        assert!(errors.contains("checklist"));
        assert!(!errors.contains("checklist[0].answer"));
    }

    #[test]
    fn checklist_ids_must_follow_the_template() {
        let mut value = valid_crew();
        value.checklist[1].id = 1;

        let errors = crew().evaluate(&value).unwrap_err();
        assert_eq!(errors.message("checklist[1].id"), Some("Expected item number 2"));
        assert!(!errors.contains("checklist[0].id"));
    }

    #[test]
    fn checklist_activities_cannot_be_rewritten() {
        let mut value = valid_crew();
        value.checklist[0].activity = "anything".to_string();

        let errors = crew().evaluate(&value).unwrap_err();
        assert_eq!(
            errors.message("checklist[0].activity"),
            Some("Expected activity 'Test the harness'")
        );
        assert_eq!(errors.len(), 1);
    }
}
