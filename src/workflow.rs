use std::collections::BTreeMap;

use serde_json::json;

use crate::{
    domain::{AuditAction, AuditEvent, PermitDocument, PermitId, Status, StepData, StepName},
    storage::{DraftStore, Envelope, KeyValueStore, LoadError, StoreError},
    validation::{ErrorList, validate_document, validate_step},
};

/// Errors raised by the workflow controller.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The current step does not validate, so the workflow cannot move on.
    #[error("step '{step}' is incomplete: {errors}")]
    NavigationBlocked {
        /// The step that failed.
        step: StepName,
        /// What is wrong with it.
        errors: ErrorList,
    },

    /// One or more steps do not validate, so the permit cannot be submitted.
    #[error("permit cannot be submitted: {} step(s) incomplete", .0.len())]
    SubmitBlocked(BTreeMap<StepName, ErrorList>),

    /// The permit could not be written to or read from storage.
    #[error("failed to persist the permit")]
    Persistence(#[from] StoreError),

    /// The permit is past the draft stage and its steps are frozen.
    #[error("permit is {status} and can no longer be edited")]
    Finalized {
        /// The current status.
        status: Status,
    },
}

/// The outcome of a successful [`Workflow::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The draft was validated, submitted and persisted.
    Submitted,
    /// The permit was already past the draft stage; nothing changed.
    Unchanged(Status),
}

/// Drives a single permit through its steps.
///
/// The controller owns the document being edited, the audit events recorded
/// since the permit was opened, and the step the user is on. Navigation and
/// edits only touch memory; [`Workflow::save_draft`] and [`Workflow::submit`]
/// persist. A failed save leaves the controller exactly as it was.
#[derive(Debug)]
pub struct Workflow<S> {
    document: PermitDocument,
    audit_trail: Vec<AuditEvent>,
    step: StepName,
    drafts: DraftStore<S>,
}

impl<S: KeyValueStore> Workflow<S> {
    /// Start a new permit.
    ///
    /// Nothing is persisted until the first save.
    #[must_use]
    pub fn new(drafts: DraftStore<S>) -> Self {
        let document = PermitDocument::new(drafts.config());
        tracing::debug!("Created permit {}", document.permit_id());

        let created = AuditEvent::new(
            AuditAction::PermitCreated,
            Some(json!({ "permitNo": document.permit_no() })),
        );

        Self {
            document,
            audit_trail: vec![created],
            step: StepName::FIRST,
            drafts,
        }
    }

    /// Continue working on a stored permit, starting at the first step.
    #[must_use]
    pub fn resume(drafts: DraftStore<S>, envelope: Envelope) -> Self {
        tracing::debug!("Resuming permit {}", envelope.data.permit_id());
        Self {
            document: envelope.data,
            audit_trail: envelope.audit_trail,
            step: StepName::FIRST,
            drafts,
        }
    }

    /// Resume the given permit, or start a new one if it is missing or its
    /// stored draft is corrupt.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Persistence`] if the store cannot be read.
    pub fn open(drafts: DraftStore<S>, permit_id: &PermitId) -> Result<Self, WorkflowError> {
        let loaded = drafts.load(permit_id);
        Self::resume_or_start(drafts, loaded)
    }

    /// Resume the most recently saved permit, or start a new one if there is
    /// none or its stored draft is corrupt.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Persistence`] if the store cannot be read.
    pub fn open_latest(drafts: DraftStore<S>) -> Result<Self, WorkflowError> {
        let loaded = drafts.load_latest();
        Self::resume_or_start(drafts, loaded)
    }

    fn resume_or_start(
        drafts: DraftStore<S>,
        loaded: Result<Envelope, LoadError>,
    ) -> Result<Self, WorkflowError> {
        match loaded {
            Ok(envelope) => Ok(Self::resume(drafts, envelope)),
            Err(LoadError::NotFound(key)) => {
                tracing::debug!("Nothing stored under '{key}', starting a new permit");
                Ok(Self::new(drafts))
            }
            Err(e @ LoadError::Corrupt { .. }) => {
                tracing::warn!("{e}, starting a new permit");
                Ok(Self::new(drafts))
            }
            Err(LoadError::Store(e)) => Err(e.into()),
        }
    }

    /// The document as currently edited.
    #[must_use]
    pub const fn document(&self) -> &PermitDocument {
        &self.document
    }

    /// The audit trail: events already stored followed by events recorded
    /// since the last save.
    #[must_use]
    pub fn audit_trail(&self) -> &[AuditEvent] {
        &self.audit_trail
    }

    /// The step the user is on.
    #[must_use]
    pub const fn current_step(&self) -> StepName {
        self.step
    }

    /// The draft store the controller persists to.
    #[must_use]
    pub const fn drafts(&self) -> &DraftStore<S> {
        &self.drafts
    }

    /// Give back the draft store.
    #[must_use]
    pub fn into_drafts(self) -> DraftStore<S> {
        self.drafts
    }

    /// Validate the current step.
    ///
    /// # Errors
    ///
    /// Returns the issues found in the current step.
    pub fn validate_current(&self) -> Result<(), ErrorList> {
        validate_step(self.step, self.document.step_data())
    }

    /// Move to the next step if the current one validates.
    ///
    /// On the last step this succeeds without moving.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NavigationBlocked`] if the current step does
    /// not validate. The workflow stays where it is.
    pub fn next(&mut self) -> Result<StepName, WorkflowError> {
        let from = self.step;
        self.validate_current()
            .map_err(|errors| WorkflowError::NavigationBlocked { step: from, errors })?;

        let to = from.next().unwrap_or(from);
        self.step = to;
        self.record(
            AuditAction::StepAdvanced,
            Some(json!({ "from": from, "to": to })),
        );
        tracing::debug!("Advanced from '{from}' to '{to}'");
        Ok(to)
    }

    /// Move to the previous step. Going back is never blocked.
    pub fn back(&mut self) -> StepName {
        self.step = self.step.previous().unwrap_or(self.step);
        self.step
    }

    /// Replace the data of one step.
    ///
    /// The step replaced is the one the data belongs to, which need not be
    /// the current step. The data is not validated here.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Finalized`] if the permit is no longer a
    /// draft.
    pub fn update_step(&mut self, data: impl Into<StepData>) -> Result<(), WorkflowError> {
        let status = self.document.status();
        if !status.is_editable() {
            return Err(WorkflowError::Finalized { status });
        }

        let data = data.into();
        let step = data.name();
        self.document = self.document.with_step_data(data);
        self.record(AuditAction::StepUpdated, Some(json!({ "step": step })));
        tracing::debug!("Updated step '{step}'");
        Ok(())
    }

    /// Persist the document as it is, valid or not.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Persistence`] if the draft cannot be written.
    pub fn save_draft(&mut self) -> Result<(), WorkflowError> {
        let saved = AuditEvent::new(
            AuditAction::DraftSaved,
            Some(json!({
                "step": self.step,
                "fingerprint": self.document.fingerprint(),
            })),
        );
        self.persist(self.document.clone(), saved)?;
        Ok(())
    }

    /// Revalidate every step and, if all pass, submit the permit.
    ///
    /// A permit that is already submitted or approved is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::SubmitBlocked`] with the issues of every
    /// failing step, or [`WorkflowError::Persistence`] if the submitted
    /// permit cannot be written. In both cases the permit stays a draft.
    pub fn submit(&mut self) -> Result<Submission, WorkflowError> {
        let Some(status) = self.document.status().on_submit() else {
            tracing::debug!(
                "Permit {} is already {}",
                self.document.permit_id(),
                self.document.status()
            );
            return Ok(Submission::Unchanged(self.document.status()));
        };

        validate_document(&self.document).map_err(WorkflowError::SubmitBlocked)?;

        let submitted = self.document.with_status(status);
        let event = AuditEvent::new(
            AuditAction::PermitSubmitted,
            Some(json!({
                "permitNo": submitted.permit_no(),
                "fingerprint": submitted.fingerprint(),
            })),
        );
        self.persist(submitted, event)?;

        tracing::info!("Submitted permit {}", self.document.permit_id());
        Ok(Submission::Submitted)
    }

    fn record(&mut self, action: AuditAction, details: Option<serde_json::Value>) {
        self.audit_trail.push(AuditEvent::new(action, details));
    }

    /// Save `document` with the pending trail plus `event`, adopting what
    /// was stored only once the write succeeds.
    fn persist(&mut self, document: PermitDocument, event: AuditEvent) -> Result<(), StoreError> {
        let mut audit_trail = self.audit_trail.clone();
        audit_trail.push(event);

        let stored = self.drafts.save(&Envelope {
            data: document,
            audit_trail,
        })?;

        self.document = stored.data;
        self.audit_trail = stored.audit_trail;
        Ok(())
    }
}
