use std::{collections::BTreeMap, path::Path};

use clap::Parser;
use permit::{ErrorList, PermitId, StepName, validate_document, validate_step};
use tracing::instrument;

use super::terminal::{self, Colorize};

#[derive(Debug, Parser)]
#[command(about = "Validate a permit against the rules of every step")]
pub struct Validate {
    /// The permit to validate (defaults to the most recently saved)
    id: Option<PermitId>,

    /// Validate only this step
    #[arg(long)]
    step: Option<StepName>,

    /// Only print failures
    #[arg(long, short)]
    quiet: bool,
}

impl Validate {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let drafts = super::open_drafts(root)?;
        let envelope = super::load_envelope(&drafts, self.id.as_ref())?;
        let document = &envelope.data;

        let failures = match self.step {
            Some(step) => validate_step(step, document.step_data())
                .err()
                .map(|errors| BTreeMap::from([(step, errors)]))
                .unwrap_or_default(),
            None => validate_document(document).err().unwrap_or_default(),
        };

        let steps = self.step.map_or(StepName::ALL.to_vec(), |step| vec![step]);
        if !self.quiet {
            println!("Validating permit {}...\n", document.permit_no());
        }
        print_report(&steps, &failures, self.quiet);

        if !failures.is_empty() {
            std::process::exit(2);
        }

        Ok(())
    }
}

/// Prints one line per step, followed by the issues of failing steps.
pub fn print_report(steps: &[StepName], failures: &BTreeMap<StepName, ErrorList>, quiet: bool) {
    for step in steps {
        match failures.get(step) {
            None if quiet => {}
            None => println!("{} {}", terminal::mark(true), step.title()),
            Some(errors) => {
                println!(
                    "{} {}",
                    terminal::mark(false),
                    format!("{}: {} issue(s)", step.title(), errors.len()).warning()
                );
                for issue in errors.iter() {
                    println!("    {} {}", format!("{}:", issue.path()).dim(), issue.message());
                }
            }
        }
    }

    if !quiet {
        println!();
        if failures.is_empty() {
            println!("{}", "✅ All checks passed".success());
        } else {
            println!(
                "{}",
                format!("⚠️  {} step(s) incomplete", failures.len()).warning()
            );
        }
    }
}
