// Platform and artifact specific steps around an install.
// Each hook is one row of a static table keyed by OS and (optionally) artifact name, so the
// installer itself carries no platform conditionals.

use std::path::Path;

use crate::libs::errors::InstallError;
use crate::libs::process_runner::ProcessRunner;
use crate::log_debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    /// Runs against the source file before anything is copied.
    PreInstall,
    /// Runs against the installed versioned file once the link exists.
    PostInstall,
}

/// What a hook gets to work with.
pub struct HookContext<'a> {
    pub runner: &'a ProcessRunner,
    pub source: &'a Path,
    pub installed: &'a Path,
}

pub struct InstallHook {
    pub description: &'static str,
    pub stage: HookStage,
    /// `None` matches every OS.
    pub os: Option<&'static str>,
    /// Bare artifact name; `None` matches every artifact.
    pub artifact: Option<&'static str>,
    pub action: fn(&HookContext) -> Result<(), InstallError>,
}

impl InstallHook {
    pub fn applies(&self, stage: HookStage, os: &str, bare_name: &str) -> bool {
        self.stage == stage
            && self.os.is_none_or(|wanted| wanted == os)
            && self.artifact.is_none_or(|wanted| wanted == bare_name)
    }
}

pub static INSTALL_HOOKS: &[InstallHook] = &[
    InstallHook {
        description: "clear the quarantine attribute",
        stage: HookStage::PreInstall,
        os: Some("macos"),
        artifact: None,
        action: clear_quarantine,
    },
    InstallHook {
        description: "make the xhyve driver setuid root",
        stage: HookStage::PostInstall,
        os: Some("macos"),
        artifact: Some("docker-machine-driver-xhyve"),
        action: setuid_root,
    },
];

/// Hooks of `stage` that apply to `bare_name` on `os`, in table order.
pub fn hooks_for<'t>(
    table: &'t [InstallHook],
    stage: HookStage,
    os: &str,
    bare_name: &str,
) -> impl Iterator<Item = &'t InstallHook> {
    let os = os.to_string();
    let bare_name = bare_name.to_string();
    table
        .iter()
        .filter(move |hook| hook.applies(stage, &os, &bare_name))
}

/// Runs every matching hook, stopping at the first failure.
pub fn run_hooks(
    table: &[InstallHook],
    stage: HookStage,
    os: &str,
    bare_name: &str,
    ctx: &HookContext,
) -> Result<(), InstallError> {
    for hook in hooks_for(table, stage, os, bare_name) {
        log_debug!("[{}] {:?} hook: {}", bare_name, stage, hook.description);
        (hook.action)(ctx)?;
    }
    Ok(())
}

// Downloaded files get a quarantine xattr on macOS; `-c` clears all of them.
fn clear_quarantine(ctx: &HookContext) -> Result<(), InstallError> {
    let source = ctx.source.display().to_string();
    ctx.runner.run_privileged("xattr", &["-c", source.as_str()])?;
    Ok(())
}

fn setuid_root(ctx: &HookContext) -> Result<(), InstallError> {
    let installed = ctx.installed.display().to_string();
    ctx.runner.run_privileged("chown", &["root:wheel", installed.as_str()])?;
    ctx.runner.run_privileged("chmod", &["u+s", installed.as_str()])?;
    Ok(())
}
