use std::path::Path;

use clap::Parser;
use dialoguer::Confirm;
use permit::{PermitId, StepName, Submission, Workflow, WorkflowError};
use tracing::instrument;

use super::{terminal::Colorize, validate::print_report};

#[derive(Debug, Parser)]
#[command(about = "Validate every step and submit the permit for approval")]
pub struct Submit {
    /// The permit to submit (defaults to the most recently saved)
    id: Option<PermitId>,

    /// Skip the confirmation prompt
    #[arg(long, short)]
    yes: bool,
}

impl Submit {
    #[instrument]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let drafts = super::open_drafts(root)?;
        let envelope = super::load_envelope(&drafts, self.id.as_ref())?;
        let mut workflow = Workflow::resume(drafts, envelope);
        let permit_no = workflow.document().permit_no().to_string();

        let is_draft = workflow.document().status().on_submit().is_some();
        if is_draft && !self.yes {
            let proceed = Confirm::new()
                .with_prompt(format!("Submit permit {permit_no}?"))
                .default(false)
                .interact()?;
            if !proceed {
                println!("Cancelled");
                return Ok(());
            }
        }

        match workflow.submit() {
            Ok(Submission::Submitted) => {
                println!(
                    "{}",
                    format!("✅ Submitted permit {permit_no}").success()
                );
            }
            Ok(Submission::Unchanged(status)) => {
                println!(
                    "{}",
                    format!("Permit {permit_no} is already {status}").dim()
                );
            }
            Err(WorkflowError::SubmitBlocked(failures)) => {
                print_report(&StepName::ALL, &failures, true);
                anyhow::bail!(
                    "Permit {permit_no} cannot be submitted: {} step(s) incomplete",
                    failures.len()
                );
            }
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }
}
