use anyhow::Result;
use clap::Parser;
use std::io::{self, BufWriter};

use physlr::pipeline::commands::{execute, Cli};
use physlr::utils::configuration::{setup_logging, ConfigurationManager};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let manager = ConfigurationManager::load(cli.config.as_deref())?;
    setup_logging(&manager.config().logging, cli.verbose)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    execute(&cli, manager.config(), &mut out)
}
