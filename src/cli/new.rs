use std::path::Path;

use permit::Workflow;
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Default, clap::Parser)]
pub struct New {}

impl New {
    #[instrument]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let mut workflow = Workflow::new(super::open_drafts(root)?);
        workflow.save_draft()?;

        let document = workflow.document();
        println!(
            "{}",
            format!("✅ Created permit {}", document.permit_no()).success()
        );
        println!("  Id:          {}", document.permit_id());
        println!("  Certificate: {}", document.certificate_no());
        println!();
        println!("Next steps:");
        println!("  ptw edit basic basic.yaml");

        Ok(())
    }
}
