// This file contains the primary logic for the `desktop install` command.
// It brings `desktop` itself up to date first, then walks every configured artifact and
// finishes with a summary table of what happened to each one.

use anyhow::{Context, Result};
use colored::Colorize;
use prettytable::{Cell, Row, Table};

use crate::commands::version::VERSION;
use crate::libs::upgrader::{ArtifactReport, SELF_NAME, SelfUpgrade, UpgradeOutcome, Upgrader};
use crate::libs::utilities::platform::detect_os;
use crate::schemas::config::InstallerConfig;
use crate::{log_debug, log_info, log_warn};

/// Main entry point for the `install` command.
///
/// # Arguments
/// * `config`: The resolved installer configuration.
/// * `binpath` / `softlinkpath`: Optional overrides of the two install directories.
/// * `update`: Check for a newer `desktop` even when not running the installed copy.
/// * `config_file` / `debug`: Global flags, handed on to a relaunched `desktop`.
pub fn run(
    config: InstallerConfig,
    binpath: Option<String>,
    softlinkpath: Option<String>,
    update: bool,
    config_file: Option<&str>,
    debug: bool,
) -> Result<()> {
    let os = detect_os();
    let config = config.with_overrides(binpath, softlinkpath);
    log_debug!("Installing for {} into {:?}", os, config.install_target());

    let upgrader = Upgrader::new(&config, &os).with_relaunch_args(relaunch_args(&config, config_file, debug));
    let running_exe = std::env::current_exe().context("locating the running desktop executable")?;

    let self_outcome = upgrader
        .upgrade_self(&config.self_release_index, VERSION, &running_exe, update)
        .with_context(|| format!("upgrading {}", SELF_NAME))?;
    if let SelfUpgrade::Relaunched { version } = &self_outcome {
        log_info!("{} {} completed the install", SELF_NAME, version);
        return Ok(());
    }

    let reports = upgrader.upgrade_all(&config.artifacts);
    print_summary(&self_outcome, &reports);

    let failed = reports.iter().filter(|r| r.result.is_err()).count();
    if failed > 0 {
        log_warn!(
            "{} of {} tools could not be installed, see the log for details",
            failed,
            reports.len()
        );
    }
    Ok(())
}

// A relaunched `desktop` installs into the same directories with the same flags, minus `--update`.
fn relaunch_args(config: &InstallerConfig, config_file: Option<&str>, debug: bool) -> Vec<String> {
    let target = config.install_target();
    let mut args = vec![
        "install".to_string(),
        "--binpath".to_string(),
        target.versioned_path.to_string_lossy().into_owned(),
        "--softlinkpath".to_string(),
        target.link_path.to_string_lossy().into_owned(),
    ];
    if let Some(file) = config_file {
        args.extend(["--config".to_string(), file.to_string()]);
    }
    if debug {
        args.push("--debug".to_string());
    }
    args
}

fn print_summary(self_outcome: &SelfUpgrade, reports: &[ArtifactReport]) {
    let mut table = Table::new();
    table.set_titles(Row::new(vec![
        Cell::new("Tool").style_spec("b"),
        Cell::new("Version").style_spec("b"),
        Cell::new("Status").style_spec("b"),
    ]));

    let (version, status) = match self_outcome {
        SelfUpgrade::Installed { version, .. } => (version.as_str(), "installed"),
        SelfUpgrade::AlreadyInstalled { version } => (version.as_str(), "up to date"),
        SelfUpgrade::Relaunched { version } => (version.as_str(), "upgraded"),
    };
    table.add_row(summary_row(SELF_NAME, version, status, "Fg"));

    for report in reports {
        let row = match &report.result {
            Ok(UpgradeOutcome::Installed { version, .. }) => summary_row(&report.name, version, "installed", "Fg"),
            Ok(UpgradeOutcome::UpToDate { version }) => summary_row(&report.name, version, "up to date", "Fg"),
            Ok(UpgradeOutcome::Skipped { reason }) => summary_row(&report.name, "-", reason, "Fy"),
            Err(e) => summary_row(&report.name, "-", &e.to_string(), "Fr"),
        };
        table.add_row(row);
    }

    println!("\n{}", "Install summary".bold());
    table.printstd();
}

fn summary_row(name: &str, version: &str, status: &str, status_style: &str) -> Row {
    Row::new(vec![
        Cell::new(name),
        Cell::new(version),
        Cell::new(status).style_spec(status_style),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::cmd_enums::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn test_relaunch_args_carry_directories_and_global_flags() {
        let config = InstallerConfig::default()
            .with_overrides(Some("/opt/desktop/bin/".to_string()), Some("/opt/desktop/links/".to_string()));
        let args = relaunch_args(&config, Some("/etc/desktop.yaml"), true);
        assert_eq!(
            args,
            [
                "install",
                "--binpath",
                "/opt/desktop/bin/",
                "--softlinkpath",
                "/opt/desktop/links/",
                "--config",
                "/etc/desktop.yaml",
                "--debug",
            ]
        );

        let cli = Cli::try_parse_from(std::iter::once("desktop".to_string()).chain(args)).unwrap();
        assert!(cli.debug);
        assert_eq!(cli.config.as_deref(), Some("/etc/desktop.yaml"));
        match cli.command {
            Some(Commands::Install {
                binpath,
                softlinkpath,
                update,
            }) => {
                assert_eq!(binpath.as_deref(), Some("/opt/desktop/bin/"));
                assert_eq!(softlinkpath.as_deref(), Some("/opt/desktop/links/"));
                assert!(!update);
            }
            _ => panic!("expected the install subcommand"),
        }
    }

    #[test]
    fn test_relaunch_args_omit_unset_flags() {
        let config = InstallerConfig::default().with_overrides(Some("/a".to_string()), Some("/b".to_string()));
        assert_eq!(
            relaunch_args(&config, None, false),
            ["install", "--binpath", "/a", "--softlinkpath", "/b"]
        );
    }
}
