use std::path::{Path, PathBuf};

mod edit;
mod history;
mod init;
mod list;
mod new;
mod show;
mod submit;
mod terminal;
mod validate;

use clap::ArgAction;
use edit::Edit;
use history::History;
use init::Init;
use list::List;
use new::New;
use permit::{Config, DirectoryStore, DraftStore, Envelope, PermitId};
use show::Show;
use submit::Submit;
use validate::Validate;

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The directory permits are stored in
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::Show(Show::default()))
            .run(&self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false)
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Write a default configuration file
    Init(Init),

    /// Start a new permit and save it as a draft
    New(New),

    /// Show a permit and which of its steps are complete (default)
    Show(Show),

    /// Replace the data of one step from a JSON or YAML file
    Edit(Edit),

    /// Validate a permit, or one of its steps
    ///
    /// Exits with status 2 if anything is incomplete.
    Validate(Validate),

    /// Validate every step and submit the permit
    Submit(Submit),

    /// Print the audit trail of a permit
    History(History),

    /// Summarize every stored permit
    List(List),
}

impl Command {
    fn run(self, root: &Path) -> anyhow::Result<()> {
        match self {
            Self::Init(command) => command.run(root)?,
            Self::New(command) => command.run(root)?,
            Self::Show(command) => command.run(root)?,
            Self::Edit(command) => command.run(root)?,
            Self::Validate(command) => command.run(root)?,
            Self::Submit(command) => command.run(root)?,
            Self::History(command) => command.run(root)?,
            Self::List(command) => command.run(root)?,
        }
        Ok(())
    }
}

/// Loads `config.toml` from the root, falling back to the defaults if it is
/// missing or invalid.
fn load_config(root: &Path) -> Config {
    let path = root.join(CONFIG_FILE);
    if !path.exists() {
        tracing::debug!("No {CONFIG_FILE} in {}, using defaults", root.display());
        return Config::default();
    }
    Config::load(&path).unwrap_or_else(|e| {
        tracing::warn!("Ignoring invalid {}: {e}", path.display());
        Config::default()
    })
}

/// Opens the draft store in the root directory.
fn open_drafts(root: &Path) -> anyhow::Result<DraftStore<DirectoryStore>> {
    let config = load_config(root);
    let store = DirectoryStore::new(root.to_path_buf())?;
    Ok(DraftStore::new(store, config))
}

/// Loads the given permit, or the most recently saved one.
fn load_envelope(
    drafts: &DraftStore<DirectoryStore>,
    permit_id: Option<&PermitId>,
) -> anyhow::Result<Envelope> {
    let envelope = match permit_id {
        Some(permit_id) => drafts.load(permit_id)?,
        None => drafts.load_latest()?,
    };
    Ok(envelope)
}
