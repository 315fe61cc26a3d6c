mod cli;
mod commands;
mod logging;

use clap::Parser;

use crate::cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (destination, level) = logging::destination(&cli.log_file, cli.verbose);
    logging::initialize(destination, level);

    let output = commands::execute(&cli)?;
    println!("{output}");
    Ok(())
}
