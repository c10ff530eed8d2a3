use std::path::Path;

use chrono::Local;
use clap::Parser;
use permit::{AuditEvent, PermitId};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Print the audit trail of a permit, oldest first")]
pub struct History {
    /// The permit to show (defaults to the most recently saved)
    id: Option<PermitId>,

    /// Only show the most recent events
    #[arg(long, short = 'n', value_name = "N")]
    limit: Option<usize>,
}

impl History {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let drafts = super::open_drafts(root)?;
        let envelope = super::load_envelope(&drafts, self.id.as_ref())?;

        println!("# {}", envelope.data.permit_no());
        println!();

        let trail = &envelope.audit_trail;
        let skip = self
            .limit
            .map_or(0, |limit| trail.len().saturating_sub(limit));
        for event in &trail[skip..] {
            println!("{}", format_event(event));
        }

        Ok(())
    }
}

fn format_event(event: &AuditEvent) -> String {
    let ts = event
        .ts()
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S");
    let details = event
        .details()
        .map(|details| format!("  {details}").dim())
        .unwrap_or_default();
    format!(
        "{} {:<16}{details}",
        ts.to_string().dim(),
        event.action().as_str()
    )
}
