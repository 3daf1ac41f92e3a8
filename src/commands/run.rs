// `desktop run`: executes one command through the process runner.
// Handy to check that elevation and remote access work before an install, and to watch a
// long-running command until it prints a readiness line.

use anyhow::{Context, Result, bail};

use crate::libs::process_runner::{ExecMode, ProcessInvocation, ProcessRunner, SshShell};
use crate::log_info;
use crate::schemas::config::InstallerConfig;

pub fn run(
    config: &InstallerConfig,
    sudo: bool,
    ssh: Option<String>,
    until: Option<String>,
    command: Vec<String>,
) -> Result<()> {
    let Some((program, args)) = command.split_first() else {
        bail!("no command given");
    };

    let runner = ProcessRunner::new(config.elevation.clone());
    let shell = ssh.as_deref().map(SshShell::new);
    let mode = match (&shell, sudo) {
        (Some(shell), _) => ExecMode::Remote(shell),
        (None, true) => ExecMode::LocalPrivileged,
        (None, false) => ExecMode::Local,
    };

    let mut invocation = ProcessInvocation::new(program, args, mode);
    if let Some(pattern) = until.as_deref() {
        invocation = invocation.until(pattern);
    }
    let label = invocation.command_line();

    let output = runner
        .run(&invocation)
        .with_context(|| format!("running `{}`", label))?;

    if output.halted {
        log_info!("Saw '{}', leaving `{}` running", until.unwrap_or_default(), label);
    } else {
        log_info!(
            "`{}` exited with {:?} ({} lines on stdout, {} on stderr)",
            label,
            output.exit_code,
            output.stdout.len(),
            output.stderr.len()
        );
    }
    Ok(())
}
