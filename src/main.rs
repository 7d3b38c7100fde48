//! # Command Line Interface
//!
//! The subcommands are built in `cli.rs` and run by the `commands` module.

mod cli;

use hlasmkit::commands;
use hlasmkit::commands::CommandError;

fn main() -> Result<(),Box<dyn std::error::Error>>
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let matches = cli::build_cli().get_matches();

    match matches.subcommand() {
        Some(("outline",cmd)) => commands::query::outline(cmd),
        Some(("definition",cmd)) => commands::query::definition(cmd),
        Some(("references",cmd)) => commands::query::references(cmd),
        Some(("hover",cmd)) => commands::query::hover(cmd),
        Some(("complete",cmd)) => commands::query::complete(cmd),
        _ => {
            log::error!("No subcommand was found, try `hlasmkit --help`");
            Err(Box::new(CommandError::InvalidCommand))
        }
    }
}
