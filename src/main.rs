//! `ptw`, the command line front end of the permit-to-work engine.

use clap::Parser;

mod cli;
use cli::Cli;

fn main() -> anyhow::Result<()> {
    Cli::parse().run()
}
