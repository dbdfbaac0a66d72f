//! # Command Line Interface
//!
//! The argument parser is in `cli.rs`, which is shared with the build script.
//! Subcommands are run by the `commands` module.

mod cli;

use env_logger;
#[cfg(windows)]
use colored;
use log::error;
use a2prodos::commands;
use a2prodos::commands::CommandError;

fn main() -> Result<(),Box<dyn std::error::Error>>
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    #[cfg(windows)]
    let _ = colored::control::set_virtual_terminal(true);
    let matches = cli::build_cli().get_matches();

    let res = match matches.subcommand() {
        Some(("catalog",cmd)) => commands::stat::catalog(cmd),
        Some(("tree",cmd)) => commands::stat::tree(cmd),
        Some(("stat",cmd)) => commands::stat::stat(cmd),
        Some(("get",cmd)) => commands::get::get(cmd),
        _ => {
            error!("No subcommand was found, try `a2prodos --help`");
            Err(Box::new(CommandError::InvalidCommand) as Box<dyn std::error::Error>)
        }
    };
    if let Err(e) = &res {
        error!("{}",e);
    }
    res
}
