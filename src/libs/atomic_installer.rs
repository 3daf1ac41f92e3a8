//! # Atomic Installer
//!
//! Makes an extracted binary live at a stable name on the PATH:
//!
//! ```text
//! <versioned_path>/<tool>-<version>      immutable copy, one per installed version
//! <link_path>/<tool> -> ^                single symlink, replaced on every install
//! ```
//!
//! Every mutation is its own privileged command issued through the [`ProcessRunner`], so the
//! installer itself never needs to run as root. The first failing command aborts the rest of
//! the sequence; there is no rollback.

use std::path::{Path, PathBuf};

use crate::libs::errors::InstallError;
use crate::libs::install_hooks::{HookContext, HookStage, INSTALL_HOOKS, InstallHook, run_hooks};
use crate::libs::process_runner::ProcessRunner;
use crate::libs::utilities::platform::executable_name;
use crate::log_info;
use crate::schemas::artifact::InstallTarget;

pub struct AtomicInstaller {
    target: InstallTarget,
    runner: ProcessRunner,
    os: String,
    hooks: &'static [InstallHook],
}

impl AtomicInstaller {
    pub fn new(target: InstallTarget, runner: ProcessRunner, os: &str) -> Self {
        AtomicInstaller {
            target,
            runner,
            os: os.to_string(),
            hooks: INSTALL_HOOKS,
        }
    }

    pub fn target(&self) -> &InstallTarget {
        &self.target
    }

    /// Copies `source` to `<versioned_path>/<versioned_name>` and points `<link_path>/<bare_name>`
    /// at it. Returns the path of the installed versioned file.
    pub fn install(&self, source: &Path, versioned_name: &str, bare_name: &str) -> Result<PathBuf, InstallError> {
        let versioned_name = executable_name(versioned_name, &self.os);
        let bare_name = executable_name(bare_name, &self.os);
        let installed = self.target.versioned_file(&versioned_name);
        let link = self.target.link(&bare_name);

        log_info!(
            "Installing {} pointing to {} in {}",
            link.display(),
            source.display(),
            self.target.versioned_path.display()
        );

        let ctx = HookContext {
            runner: &self.runner,
            source,
            installed: &installed,
        };
        run_hooks(self.hooks, HookStage::PreInstall, &self.os, &bare_name, &ctx)?;

        let versioned_dir = self.target.versioned_path.display().to_string();
        let link_dir = self.target.link_path.display().to_string();
        let source_arg = source.display().to_string();
        let installed_arg = installed.display().to_string();
        let link_arg = link.display().to_string();

        self.step("mkdir", &["-p", &versioned_dir])?;
        self.step("mkdir", &["-p", &link_dir])?;
        self.step("cp", &[&source_arg, &installed_arg])?;
        self.step("chmod", &["0755", &installed_arg])?;
        self.step("rm", &["-f", &link_arg])?;
        self.step("ln", &["-s", &installed_arg, &link_arg])?;

        run_hooks(self.hooks, HookStage::PostInstall, &self.os, &bare_name, &ctx)?;
        Ok(installed)
    }

    fn step(&self, command: &str, args: &[&str]) -> Result<(), InstallError> {
        self.runner.run_privileged(command, args).map(|_| ())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;

    fn installer(root: &Path) -> AtomicInstaller {
        AtomicInstaller::new(
            InstallTarget::new(root.join("share/bin"), root.join("bin")),
            ProcessRunner::new(Vec::new()),
            "linux",
        )
    }

    #[test]
    fn test_reinstall_replaces_link_and_keeps_old_version() {
        let temp = tempfile::tempdir().unwrap();
        let installer = installer(temp.path());
        let v1 = temp.path().join("tool-v1");
        let v2 = temp.path().join("tool-v2");
        fs::write(&v1, "one").unwrap();
        fs::write(&v2, "two").unwrap();

        let first = installer.install(&v1, "tool-1.0.0", "tool").unwrap();
        let second = installer.install(&v2, "tool-2.0.0", "tool").unwrap();

        let link = temp.path().join("bin/tool");
        assert_eq!(fs::read_link(&link).unwrap(), second);
        assert_eq!(fs::read_to_string(&link).unwrap(), "two");
        assert_eq!(fs::read_to_string(&first).unwrap(), "one");
        assert_eq!(
            fs::read_dir(temp.path().join("bin")).unwrap().count(),
            1,
            "exactly one link per bare name"
        );
    }

    #[test]
    fn test_installed_copy_is_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("download");
        fs::write(&source, "#!/bin/sh\n").unwrap();

        let installed = installer(temp.path()).install(&source, "tool-2.0.0", "tool").unwrap();

        assert_eq!(installed, temp.path().join("share/bin/tool-2.0.0"));
        let mode = fs::metadata(&installed).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_failed_step_aborts_before_linking() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("not-downloaded");

        let err = installer(temp.path()).install(&missing, "tool-2.0.0", "tool").unwrap_err();

        match err {
            InstallError::CommandFailed { command, stderr, .. } => {
                assert!(command.starts_with("cp "));
                assert!(!stderr.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(fs::symlink_metadata(temp.path().join("bin/tool")).is_err());
    }
}
