//! The schema of each workflow step.

use std::sync::LazyLock;

use super::{Cardinality, Issue, Primitive, Schema};
use crate::domain::{
    DateTimeRange, SignatureData, checklist,
    field::Role,
    sections::{
        BasicDetails, DeEnergization, JobCompletion, PermitToWork, PreExecution,
        ReEnergizeAuthorization, ReEnergizeInstruction, WorkAuthorization,
    },
};

fn range() -> Schema<DateTimeRange> {
    Schema::<DateTimeRange>::new()
        .field("fromDate", |r| r.from_date.as_str(), Primitive::Date)
        .field("fromTime", |r| r.from_time.as_str(), Primitive::Time)
        .field("toDate", |r| r.to_date.as_str(), Primitive::Date)
        .field("toTime", |r| r.to_time.as_str(), Primitive::Time)
        .refine(
            "",
            "End date and time must be after the start date and time",
            DateTimeRange::is_ordered,
        )
}

fn signature() -> Schema<SignatureData> {
    Schema::<SignatureData>::new()
        .field("name", |s| s.name.as_str(), Primitive::Required)
        .field("name", |s| s.name.as_str(), Primitive::MinLength(2))
        .field("role", |s| s.role.as_str(), Primitive::Required)
        .field("contactNo", |s| s.contact_no.as_str(), Primitive::Phone)
        .field("date", |s| s.date.as_str(), Primitive::Date)
        .field("time", |s| s.time.as_str(), Primitive::Time)
        .optional(
            "signatureImage",
            |s| s.signature_image.as_deref(),
            Primitive::Required,
        )
}

fn authorizations<T: 'static>(
    schema: Schema<T>,
    get: fn(&T) -> &[SignatureData],
    cardinality: Cardinality,
) -> Schema<T> {
    schema
        .count("authorizations", get, cardinality)
        .each("authorizations", get, signature())
}

pub(super) static BASIC: LazyLock<Schema<BasicDetails>> = LazyLock::new(|| {
    Schema::<BasicDetails>::new()
        .field("powerLine", |s| s.power_line.as_str(), Primitive::Required)
        .field(
            "affectedPlant",
            |s| s.affected_plant.as_str(),
            Primitive::Required,
        )
        .field(
            "jobDescription",
            |s| s.job_description.as_str(),
            Primitive::Required,
        )
        .field(
            "jobDescription",
            |s| s.job_description.as_str(),
            Primitive::MinLength(5),
        )
        .optional(
            "crossReferencePermitNo",
            |s| s.cross_reference_permit_no.as_deref(),
            Primitive::Required,
        )
        .field("location", |s| s.location.as_str(), Primitive::Required)
        .nested("validity", |s| &s.validity, range())
});

pub(super) static WORK_AUTH: LazyLock<Schema<WorkAuthorization>> = LazyLock::new(|| {
    authorizations(
        Schema::<WorkAuthorization>::new(),
        |s| s.authorizations.as_slice(),
        Cardinality::Exactly(2),
    )
    .check(|s| {
        s.authorizations
            .iter()
            .zip(WorkAuthorization::ROLES)
            .position(|(signer, role)| signer.role != Role::Known(role))
            .map(|i| {
                Issue::field(
                    format!("authorizations[{i}].role"),
                    format!("Must be signed by the {}", WorkAuthorization::ROLES[i]),
                )
            })
    })
    .refine(
        "confirmed",
        "Confirm the work authorization",
        |s| s.confirmed,
    )
});

pub(super) static DE_ENERGIZE: LazyLock<Schema<DeEnergization>> = LazyLock::new(|| {
    authorizations(
        Schema::<DeEnergization>::new().checklist(
            "checklist",
            |s| s.checklist.as_slice(),
            &checklist::DE_ENERGIZATION,
        ),
        |s| s.authorizations.as_slice(),
        Cardinality::AtLeast(1),
    )
    .refine(
        "confirmed",
        "Confirm the line is isolated and earthed",
        |s| s.confirmed,
    )
});

pub(super) static PERMIT_TO_WORK: LazyLock<Schema<PermitToWork>> = LazyLock::new(|| {
    authorizations(
        Schema::<PermitToWork>::new()
            .field(
                "workPartyLeader",
                |s| s.work_party_leader.as_str(),
                Primitive::MinLength(2),
            )
            .at_least("workPartySize", |s| s.work_party_size, 1)
            .field("earthingPoints", |s| s.earthing_points.as_str(), Primitive::Required),
        |s| s.authorizations.as_slice(),
        Cardinality::AtLeast(1),
    )
    .refine(
        "safetyConfirmed",
        "Confirm the work location is safe",
        |s| s.safety_confirmed,
    )
});

pub(super) static PRE_EXECUTION: LazyLock<Schema<PreExecution>> = LazyLock::new(|| {
    authorizations(
        Schema::<PreExecution>::new().checklist(
            "checklist",
            |s| s.checklist.as_slice(),
            &checklist::PRE_EXECUTION,
        ),
        |s| s.authorizations.as_slice(),
        Cardinality::AtLeast(2),
    )
    .refine(
        "confirmed",
        "Confirm the pre-execution checks",
        |s| s.confirmed,
    )
});

pub(super) static JOB_COMPLETION: LazyLock<Schema<JobCompletion>> = LazyLock::new(|| {
    authorizations(
        Schema::<JobCompletion>::new()
            .field(
                "completionDate",
                |s| s.completion_date.as_str(),
                Primitive::Date,
            )
            .field("completionTime", |s| s.completion_time.as_str(), Primitive::Time),
        |s| s.authorizations.as_slice(),
        Cardinality::AtLeast(1),
    )
    .refine(
        "workmenWithdrawn",
        "Confirm all workmen have withdrawn",
        |s| s.workmen_withdrawn,
    )
    .refine(
        "toolsRemoved",
        "Confirm tools and materials are removed",
        |s| s.tools_removed,
    )
    .refine(
        "earthsRemoved",
        "Confirm portable earths are removed",
        |s| s.earths_removed,
    )
    .refine("areaCleared", "Confirm the work area is cleared", |s| {
        s.area_cleared
    })
});

pub(super) static RE_ENERGIZE_INSTRUCTION: LazyLock<Schema<ReEnergizeInstruction>> =
    LazyLock::new(|| {
        authorizations(
            Schema::<ReEnergizeInstruction>::new().field(
                "instructions",
                |s| s.instructions.as_str(),
                Primitive::Required,
            ),
            |s| s.authorizations.as_slice(),
            Cardinality::AtLeast(1),
        )
        .refine(
            "permitCancelled",
            "Confirm the permit to work is cancelled",
            |s| s.permit_cancelled,
        )
        .refine(
            "earthsRemoved",
            "Confirm all earths are removed",
            |s| s.earths_removed,
        )
        .refine(
            "personnelClear",
            "Confirm all personnel are clear of the line",
            |s| s.personnel_clear,
        )
        .refine(
            "restorationApproved",
            "Confirm restoration is approved",
            |s| s.restoration_approved,
        )
    });

pub(super) static RE_ENERGIZE_AUTHORIZATION: LazyLock<Schema<ReEnergizeAuthorization>> =
    LazyLock::new(|| {
        authorizations(
            Schema::<ReEnergizeAuthorization>::new().checklist(
                "checklist",
                |s| s.checklist.as_slice(),
                &checklist::RE_ENERGIZATION,
            ),
            |s| s.authorizations.as_slice(),
            Cardinality::AtLeast(1),
        )
        .refine(
            "finalConfirmation",
            "Give the final confirmation to re-energize",
            |s| s.final_confirmation,
        )
    });

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::{
        StepData,
        domain::{Answer, DateTimeRange, KnownRole, SignatureData, sections::*},
        validation::{ErrorKind, validate},
    };

    fn signed(role: KnownRole) -> SignatureData {
        SignatureData {
            name: "Kofi Mensah".to_string(),
            role: role.into(),
            contact_no: "+233201234567".to_string(),
            date: "2024-01-10".to_string(),
            time: "09:15".to_string(),
            signature_image: Some("data:image/png;base64,iVBORw0KGgo=".to_string()),
        }
    }

    fn now() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn answer_all(checklist: &mut [crate::domain::ChecklistItem]) {
        for item in checklist {
            item.answer = Answer::Yes;
        }
    }

    fn basic() -> BasicDetails {
        BasicDetails {
            power_line: "132kV Northfield-Eastgate".to_string(),
            affected_plant: "Eastgate substation bay 3".to_string(),
            job_description: "Replace insulator string on tower 41".to_string(),
            cross_reference_permit_no: None,
            location: "Tower 41".to_string(),
            validity: DateTimeRange::new("2024-01-10", "08:00", "2024-01-10", "16:00"),
        }
    }

    fn de_energize() -> DeEnergization {
        let mut section = DeEnergization::template(now());
        answer_all(&mut section.checklist);
        section.authorizations = vec![signed(KnownRole::Operator)];
        section.confirmed = true;
        section
    }

    #[test]
    fn complete_basic_details_pass() {
        assert_eq!(validate(&StepData::Basic(basic())), Ok(()));
    }

    #[test]
    fn reversed_validity_is_a_cross_field_error() {
        let section = BasicDetails {
            validity: DateTimeRange::new("2024-01-10", "08:00", "2024-01-10", "06:00"),
            ..basic()
        };

        let errors = validate(&section.into()).unwrap_err();

        let issue = errors.get("validity").unwrap();
        assert_eq!(issue.kind(), ErrorKind::CrossField);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn malformed_validity_reports_the_component() {
        let section = BasicDetails {
            validity: DateTimeRange::new("2024-01-10", "8am", "2024-01-10", "16:00"),
            ..basic()
        };

        let errors = validate(&section.into()).unwrap_err();

        assert_eq!(errors.get("validity.fromTime").unwrap().kind(), ErrorKind::Field);
        assert!(!errors.contains("validity"));
    }

    #[test]
    fn blank_cross_reference_is_rejected_when_present() {
        let section = BasicDetails {
            cross_reference_permit_no: Some("  ".to_string()),
            ..basic()
        };
        let errors = validate(&section.into()).unwrap_err();
        assert!(errors.contains("crossReferencePermitNo"));
    }

    #[test]
    fn work_authorization_needs_exactly_two_signers_in_fixed_roles() {
        let mut section = WorkAuthorization {
            authorizations: vec![signed(KnownRole::Requester), signed(KnownRole::Approver)],
            confirmed: true,
        };
        assert_eq!(validate(&section.clone().into()), Ok(()));

        section.authorizations.push(signed(KnownRole::Approver));
        let errors = validate(&section.clone().into()).unwrap_err();
        assert!(errors.contains("authorizations"));

        section.authorizations.truncate(2);
        section.authorizations.swap(0, 1);
        let errors = validate(&section.into()).unwrap_err();
        assert_eq!(
            errors.message("authorizations[0].role"),
            Some("Must be signed by the Requester")
        );
    }

    #[test]
    fn unconfirmed_work_authorization_is_blocked() {
        let section = WorkAuthorization {
            authorizations: vec![signed(KnownRole::Requester), signed(KnownRole::Approver)],
            confirmed: false,
        };
        let errors = validate(&section.into()).unwrap_err();
        assert_eq!(errors.get("confirmed").unwrap().kind(), ErrorKind::CrossField);
    }

    #[test]
    fn signer_fields_are_reported_by_index() {
        let mut section = de_energize();
        let mut second = signed(KnownRole::SafetyOfficer);
        second.name = "K".to_string();
        second.contact_no = "12345".to_string();
        section.authorizations.push(second);

        let errors = validate(&section.into()).unwrap_err();

        assert_eq!(
            errors.message("authorizations[1].name"),
            Some("Must be at least 2 characters")
        );
        assert!(errors.contains("authorizations[1].contactNo"));
        assert!(!errors.contains("authorizations[0].name"));
    }

    #[test]
    fn free_text_roles_are_accepted() {
        let mut section = de_energize();
        section.authorizations[0].role = "Line Foreman".into();
        assert_eq!(validate(&section.into()), Ok(()));
    }

    #[test]
    fn de_energization_checklist_must_have_twelve_items() {
        let mut section = de_energize();
        assert_eq!(validate(&section.clone().into()), Ok(()));

        section.checklist.pop();
        section.confirmed = false;

        let errors = validate(&section.clone().into()).unwrap_err();
        assert!(errors.contains("checklist"));
        assert!(!errors.contains("confirmed"));

        section.confirmed = true;
        let errors = validate(&section.into()).unwrap_err();
        assert!(errors.contains("checklist"));
    }

    #[test]
    fn unanswered_checklist_item_is_reported() {
        let mut section = de_energize();
        section.checklist[4].answer = Answer::Unanswered;
        section.checklist[9].answer = Answer::Unanswered;

        let errors = validate(&section.into()).unwrap_err();
        assert!(errors.contains("checklist[4].answer"));
        assert!(!errors.contains("checklist[9].answer"));
    }

    #[test]
    fn rewritten_checklist_is_rejected() {
        let mut section = de_energize();
        for (id, item) in (1..).zip(&mut section.checklist) {
            item.id = id * 7;
            item.activity = "anything".to_string();
        }

        let errors = validate(&section.into()).unwrap_err();

        assert!(errors.contains("checklist[0].id"));
        assert!(errors.contains("checklist[0].activity"));
        assert!(!errors.contains("confirmed"));
    }

    #[test]
    fn not_applicable_counts_as_answered() {
        let mut section = de_energize();
        section.checklist[0].answer = Answer::NotApplicable;
        assert_eq!(validate(&section.into()), Ok(()));
    }

    #[test]
    fn pre_execution_needs_two_signers() {
        let mut section = PreExecution::template(now());
        answer_all(&mut section.checklist);
        section.authorizations = vec![signed(KnownRole::PermitHolder)];
        section.confirmed = true;

        let errors = validate(&section.clone().into()).unwrap_err();
        assert!(errors.contains("authorizations"));

        section.authorizations.push(signed(KnownRole::SafetyOfficer));
        assert_eq!(validate(&section.into()), Ok(()));
    }

    #[test]
    fn job_completion_reports_each_unchecked_flag() {
        let section = JobCompletion {
            completion_date: "2024-01-10".to_string(),
            completion_time: "15:30".to_string(),
            remarks: None,
            workmen_withdrawn: true,
            tools_removed: false,
            earths_removed: true,
            area_cleared: false,
            authorizations: vec![signed(KnownRole::PermitHolder)],
        };

        let errors = validate(&section.into()).unwrap_err();

        assert_eq!(errors.len(), 2);
        assert!(errors.contains("toolsRemoved"));
        assert!(errors.contains("areaCleared"));
    }

    #[test]
    fn re_energize_instruction_requires_all_confirmations() {
        let mut section = ReEnergizeInstruction {
            instructions: "Close breaker 52-3 after line clear".to_string(),
            permit_cancelled: true,
            earths_removed: true,
            personnel_clear: true,
            restoration_approved: true,
            authorizations: vec![signed(KnownRole::Supervisor)],
        };
        assert_eq!(validate(&section.clone().into()), Ok(()));

        section.personnel_clear = false;
        let errors = validate(&section.into()).unwrap_err();
        assert_eq!(errors.first().path(), "personnelClear");
    }

    #[test]
    fn re_energize_authorization_checklist_has_fourteen_items() {
        let mut section = ReEnergizeAuthorization::template(now());
        answer_all(&mut section.checklist);
        section.authorizations = vec![signed(KnownRole::Approver)];
        section.final_confirmation = true;
        assert_eq!(section.checklist.len(), 14);
        assert_eq!(validate(&section.clone().into()), Ok(()));

        section.final_confirmation = false;
        let errors = validate(&section.into()).unwrap_err();
        assert!(errors.contains("finalConfirmation"));
    }

    #[test]
    fn permit_to_work_checks_party_and_flag() {
        let mut section = PermitToWork::template(now());
        section.authorizations = vec![signed(KnownRole::PermitHolder)];
        section.work_party_size = 0;

        let errors = validate(&section.clone().into()).unwrap_err();
        assert!(errors.contains("workPartyLeader"));
        assert!(errors.contains("workPartySize"));
        assert!(errors.contains("earthingPoints"));
        assert!(!errors.contains("safetyConfirmed"));

        section.work_party_leader = "Ana Lima".to_string();
        section.work_party_size = 4;
        section.earthing_points = "Towers 40 and 42".to_string();
        let errors = validate(&section.into()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.contains("safetyConfirmed"));
    }

    #[test]
    fn validation_does_not_touch_input() {
        let section = de_energize();
        let before = section.clone();
        let data = StepData::DeEnergize(section);
        let _ = validate(&data);
        assert_eq!(data, StepData::DeEnergize(before));
    }
}
