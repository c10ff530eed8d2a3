use std::path::Path;

use clap::Parser;
use permit::{Envelope, PermitId, StepName, validate_step};
use tracing::instrument;

use super::terminal::{self, Colorize};

#[derive(Debug, Default, Parser)]
#[command(about = "Display a permit and the completeness of its steps")]
pub struct Show {
    /// The permit to show (defaults to the most recently saved)
    id: Option<PermitId>,

    /// Print the stored envelope as JSON
    #[arg(long)]
    json: bool,
}

impl Show {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let drafts = super::open_drafts(root)?;
        let envelope = super::load_envelope(&drafts, self.id.as_ref())?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        } else {
            output_pretty(&envelope);
        }

        Ok(())
    }
}

fn output_pretty(envelope: &Envelope) {
    let document = &envelope.data;

    println!("# {}", document.permit_no());
    println!();

    println!("{}", "Metadata".dim());
    println!("  Id:          {}", document.permit_id());
    println!("  Certificate: {}", document.certificate_no());
    println!("  Status:      {}", terminal::status(document.status()));
    println!("  Created:     {}", document.created_at().format("%Y-%m-%d %H:%M UTC"));
    println!("  Updated:     {}", document.updated_at().format("%Y-%m-%d %H:%M UTC"));
    println!("  Events:      {}", envelope.audit_trail.len());

    println!("\n{}", "Steps".dim());
    let narrow = terminal::is_narrow();
    for step in StepName::ALL {
        let label = if narrow { step.key() } else { step.title() };
        match validate_step(step, document.step_data()) {
            Ok(()) => println!("  {} {}. {label}", terminal::mark(true), step.index() + 1),
            Err(errors) => println!(
                "  {} {}. {label} {}",
                terminal::mark(false),
                step.index() + 1,
                format!("({} issue(s))", errors.len()).dim()
            ),
        }
    }
}
