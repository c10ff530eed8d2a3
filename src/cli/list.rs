use std::path::Path;

use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use permit::{Envelope, StepName, validate_step};
use rayon::prelude::*;
use serde::Serialize;
use tracing::instrument;

use super::terminal::{self, Colorize};

/// Command arguments for `ptw list`.
#[derive(Debug, Default, Parser)]
#[command(about = "Summarize every stored permit, most recently updated first")]
pub struct List {
    /// Only list permits with this status
    #[arg(long, value_enum)]
    status: Option<StatusFilter>,

    /// Output format (default: table)
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StatusFilter {
    Draft,
    Submitted,
    Approved,
}

impl StatusFilter {
    fn matches(self, status: permit::Status) -> bool {
        matches!(
            (self, status),
            (Self::Draft, permit::Status::Draft)
                | (Self::Submitted, permit::Status::Submitted)
                | (Self::Approved, permit::Status::Approved)
        )
    }
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Row {
    permit_id: String,
    permit_no: String,
    status: permit::Status,
    updated_at: DateTime<Utc>,
    complete_steps: usize,
}

impl Row {
    fn new(envelope: &Envelope) -> Self {
        let document = &envelope.data;
        let complete_steps = StepName::ALL
            .into_iter()
            .filter(|step| validate_step(*step, document.step_data()).is_ok())
            .count();
        Self {
            permit_id: document.permit_id().to_string(),
            permit_no: document.permit_no().to_string(),
            status: document.status(),
            updated_at: document.updated_at(),
            complete_steps,
        }
    }
}

impl List {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let drafts = super::open_drafts(root)?;

        let mut envelopes = Vec::new();
        for (key, loaded) in drafts.list() {
            match loaded {
                Ok(envelope) => envelopes.push(envelope),
                Err(e) => {
                    tracing::warn!("Skipping '{key}': {e}");
                    eprintln!("{}", format!("⚠️  Skipping unreadable draft '{key}'").warning());
                }
            }
        }

        let rows = self.rows(&envelopes);

        match self.output {
            OutputFormat::Table => output_table(&rows),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        }

        Ok(())
    }

    fn rows(&self, envelopes: &[Envelope]) -> Vec<Row> {
        let mut rows: Vec<Row> = envelopes
            .par_iter()
            .filter(|envelope| {
                self.status
                    .is_none_or(|filter| filter.matches(envelope.data.status()))
            })
            .map(Row::new)
            .collect();
        rows.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.permit_no.cmp(&b.permit_no))
        });
        rows
    }
}

fn output_table(rows: &[Row]) {
    if rows.is_empty() {
        println!("{}", "No permits found".dim());
        return;
    }

    let narrow = terminal::is_narrow();
    println!(
        "{}",
        if narrow {
            format!("{:<22} {:<10} {:>5}", "PERMIT", "STATUS", "STEPS")
        } else {
            format!(
                "{:<22} {:<10} {:>5}  {:<17} {}",
                "PERMIT", "STATUS", "STEPS", "UPDATED", "ID"
            )
        }
        .dim()
    );

    for row in rows {
        let steps = format!("{}/{}", row.complete_steps, StepName::ALL.len());
        // padded separately, escape codes have no width
        let status = terminal::status(row.status);
        let padding = " ".repeat(10usize.saturating_sub(row.status.as_str().len()));
        if narrow {
            println!("{:<22} {status}{padding} {steps:>5}", row.permit_no);
        } else {
            println!(
                "{:<22} {status}{padding} {steps:>5}  {:<17} {}",
                row.permit_no,
                row.updated_at.format("%Y-%m-%d %H:%M"),
                row.permit_id.dim()
            );
        }
    }
}
