use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::Parser;
use permit::{PermitId, StepData, StepName, Workflow, validate};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Replace the data of one step of a permit")]
pub struct Edit {
    /// The step to replace (e.g. 'basic', 'work-auth', 'deEnergize')
    step: StepName,

    /// A JSON or YAML file holding the step data, or '-' to read JSON from
    /// stdin
    file: PathBuf,

    /// The permit to edit (defaults to the most recently saved, or a new
    /// permit if there is none)
    #[arg(long)]
    id: Option<PermitId>,
}

impl Edit {
    #[instrument]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let value = read_value(&self.file)?;
        let data = StepData::from_value(self.step, value)
            .with_context(|| format!("Invalid data for step '{}'", self.step))?;

        let drafts = super::open_drafts(root)?;
        let mut workflow = match &self.id {
            Some(id) => {
                let envelope = drafts.load(id)?;
                Workflow::resume(drafts, envelope)
            }
            None => Workflow::open_latest(drafts)?,
        };

        workflow.update_step(data.clone())?;
        workflow.save_draft()?;

        println!(
            "Updated {} of permit {}",
            self.step.title(),
            workflow.document().permit_no()
        );

        match validate(&data) {
            Ok(()) => println!("{}", "✓ Step is complete".success()),
            Err(errors) => {
                println!(
                    "{}",
                    format!("⚠️  Step has {} issue(s):", errors.len()).warning()
                );
                for issue in errors.iter() {
                    println!("  • {}: {}", issue.path(), issue.message());
                }
            }
        }

        Ok(())
    }
}

/// Reads step data from a file, choosing the format by extension.
///
/// `.yaml` and `.yml` files are parsed as YAML, anything else as JSON.
fn read_value(path: &Path) -> anyhow::Result<serde_json::Value> {
    if path == Path::new("-") {
        let mut content = String::new();
        io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read step data from stdin")?;
        return serde_json::from_str(&content).context("Step data on stdin is not valid JSON");
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("{} is not valid YAML", path.display()))
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("{} is not valid JSON", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use permit::{AuditAction, Status};
    use tempfile::tempdir;

    use super::*;
    use crate::cli::new::New;

    const BASIC_YAML: &str = "\
powerLine: 66kV Hillside-Quarry
affectedPlant: Quarry switching station
jobDescription: Replace damaged jumper on tower 9
location: Tower 9
validity:
  fromDate: 2024-01-10
  fromTime: '08:00'
  toDate: 2024-01-10
  toTime: '17:00'
";

    #[test]
    fn yaml_step_data_is_applied_to_the_latest_permit() {
        let tmp = tempdir().unwrap();
        New::default().run(tmp.path()).unwrap();
        let file = tmp.path().join("basic.yaml");
        fs::write(&file, BASIC_YAML).unwrap();

        Edit {
            step: StepName::Basic,
            file,
            id: None,
        }
        .run(tmp.path())
        .unwrap();

        let drafts = crate::cli::open_drafts(tmp.path()).unwrap();
        let envelope = drafts.load_latest().unwrap();
        let basic = &envelope.data.step_data().basic;
        assert_eq!(basic.power_line, "66kV Hillside-Quarry");
        assert_eq!(basic.validity.to_time, "17:00");
        assert_eq!(
            envelope.audit_trail.last().map(|event| event.action()),
            Some(&AuditAction::DraftSaved)
        );
        assert!(validate(&envelope.data.step(StepName::Basic)).is_ok());
    }

    #[test]
    fn json_files_are_read_by_default() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("step.txt");
        fs::write(&file, r#"{"instructions": "Close breaker Q3"}"#).unwrap();

        let value = read_value(&file).unwrap();

        assert_eq!(value["instructions"], "Close breaker Q3");
    }

    #[test]
    fn wrongly_typed_data_is_rejected() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("ptw.json");
        fs::write(&file, r#"{"workPartySize": "four"}"#).unwrap();

        let error = Edit {
            step: StepName::PermitToWork,
            file,
            id: None,
        }
        .run(tmp.path())
        .unwrap_err();

        assert!(error.to_string().contains("permitToWork"));
    }

    #[test]
    fn submitted_permit_cannot_be_edited() {
        let tmp = tempdir().unwrap();
        let drafts = crate::cli::open_drafts(tmp.path()).unwrap();
        let mut workflow = Workflow::new(drafts);
        workflow.save_draft().unwrap();
        let id = workflow.document().permit_id().clone();

        // mark the stored draft as submitted behind the workflow's back
        let path = tmp.path().join(format!("permit-draft-{id}.json"));
        let stored = fs::read_to_string(&path).unwrap();
        fs::write(&path, stored.replace(r#""status": "draft""#, r#""status": "submitted""#))
            .unwrap();
        let drafts = crate::cli::open_drafts(tmp.path()).unwrap();
        assert_eq!(drafts.load(&id).unwrap().data.status(), Status::Submitted);

        let file = tmp.path().join("basic.yaml");
        fs::write(&file, BASIC_YAML).unwrap();
        let error = Edit {
            step: StepName::Basic,
            file,
            id: Some(id),
        }
        .run(tmp.path())
        .unwrap_err();

        assert!(error.to_string().contains("can no longer be edited"));
    }
}
