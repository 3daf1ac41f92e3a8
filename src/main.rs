mod cli;
mod commands;
mod libs;
mod logger;
mod schemas;

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser};

use cli::cmd_enums::{Cli, Commands};
use commands::{install, run, version};
use schemas::config::InstallerConfig;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // The version line goes out before anything else touches stdout; it is what `-v` checks read.
    if cli.version || matches!(cli.command, Some(Commands::Version)) {
        version::run();
        return ExitCode::SUCCESS;
    }

    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    let config = match InstallerConfig::resolve(cli.config.as_deref().map(Path::new)) {
        Ok(config) => config,
        Err(e) => {
            logger::init(cli.debug, None);
            return Err(e);
        }
    };
    logger::init(cli.debug, Some(&config.log_dir()));

    match cli.command {
        Some(Commands::Install {
            binpath,
            softlinkpath,
            update,
        }) => install::run(config, binpath, softlinkpath, update, cli.config.as_deref(), cli.debug),
        Some(Commands::Run {
            sudo,
            ssh,
            until,
            command,
        }) => run::run(&config, sudo, ssh, until, command),
        Some(Commands::Version) => {
            version::run();
            Ok(())
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}
