//! # Upgrader
//!
//! The per-artifact upgrade routine and the run-level loop around it.
//!
//! For one artifact:
//!
//! 1. Ask the release index for the latest tag.
//! 2. Ask the installed copy (if any) for its version and compare.
//! 3. When stale: download into a private temp directory, extract the binary, install it.
//!
//! Parse-class failures (unreadable versions, bad templates) turn into a skipped upgrade;
//! everything else is reported as an error for that artifact only. The temp directory is
//! removed when the attempt ends, however it ends.
//!
//! The installer upgrades itself through the same building blocks; failures there are the
//! only ones that abort a run.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::libs::archive_extractor::extract_binary;
use crate::libs::artifact_fetcher::ArtifactFetcher;
use crate::libs::atomic_installer::AtomicInstaller;
use crate::libs::errors::InstallError;
use crate::libs::process_runner::ProcessRunner;
use crate::libs::retry::RetryPolicy;
use crate::libs::utilities::binary::make_executable;
use crate::libs::utilities::platform::{executable_name, self_asset_name};
use crate::libs::version_resolver::{VersionResolver, needs_upgrade, upgrade_decision};
use crate::schemas::artifact::{Artifact, DownloadLayout};
use crate::schemas::config::InstallerConfig;
use crate::{log_debug, log_error, log_info, log_warn};

/// Name the installer is linked under.
pub const SELF_NAME: &str = "desktop";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    Installed { version: String, path: PathBuf },
    UpToDate { version: String },
    Skipped { reason: String },
}

/// Result of one artifact's attempt, as collected by [`Upgrader::upgrade_all`].
#[derive(Debug)]
pub struct ArtifactReport {
    pub name: String,
    pub result: Result<UpgradeOutcome, InstallError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelfUpgrade {
    /// A newer release was downloaded and its own `install` has already run.
    Relaunched { version: String },
    Installed { version: String, path: PathBuf },
    AlreadyInstalled { version: String },
}

pub struct Upgrader {
    resolver: VersionResolver,
    /// Single-shot lookups for the installer's own release index.
    self_resolver: VersionResolver,
    fetcher: ArtifactFetcher,
    installer: AtomicInstaller,
    runner: ProcessRunner,
    os: String,
    /// Searched after the link directory when locating installed tools; `None` uses `PATH`.
    search_path: Option<OsString>,
    /// Arguments a newly downloaded `desktop` is started with.
    relaunch_args: Vec<String>,
}

impl Upgrader {
    pub fn new(config: &InstallerConfig, os: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(concat!("desktop/", env!("CARGO_PKG_VERSION")))
            .build();
        let runner = ProcessRunner::new(config.elevation.clone());
        Upgrader {
            resolver: VersionResolver::new(agent.clone(), runner.clone(), config.latest_lookup.clone()),
            self_resolver: VersionResolver::new(agent.clone(), runner.clone(), RetryPolicy::once()),
            fetcher: ArtifactFetcher::new(agent),
            installer: AtomicInstaller::new(config.install_target(), runner.clone(), os),
            runner,
            os: os.to_string(),
            search_path: None,
            relaunch_args: vec!["install".to_string()],
        }
    }

    #[cfg(test)]
    pub fn with_search_path(mut self, search_path: OsString) -> Self {
        self.search_path = Some(search_path);
        self
    }

    pub fn with_relaunch_args(mut self, relaunch_args: Vec<String>) -> Self {
        self.relaunch_args = relaunch_args;
        self
    }

    /// Upgrades every artifact in order. A failure is logged and the loop moves on.
    pub fn upgrade_all(&self, artifacts: &[Artifact]) -> Vec<ArtifactReport> {
        artifacts
            .iter()
            .map(|artifact| {
                let result = self.upgrade(artifact);
                if let Err(e) = &result {
                    log_error!("[{}] {}", artifact.name, e);
                }
                ArtifactReport {
                    name: artifact.name.clone(),
                    result,
                }
            })
            .collect()
    }

    pub fn upgrade(&self, artifact: &Artifact) -> Result<UpgradeOutcome, InstallError> {
        match self.try_upgrade(artifact) {
            Err(e) if e.is_parse_error() => {
                log_warn!("[{}] Skipping upgrade: {}", artifact.name, e);
                Ok(UpgradeOutcome::Skipped { reason: e.to_string() })
            }
            other => other,
        }
    }

    fn try_upgrade(&self, artifact: &Artifact) -> Result<UpgradeOutcome, InstallError> {
        let name = artifact.name.as_str();
        let latest = self.resolver.latest_version(&artifact.latest_url())?;
        let current = self.current_version(name);
        log_debug!("{} cur version == '{}', latest version == {}", name, current, latest);

        if !upgrade_decision(&current, &latest)? {
            log_info!("{} is already up to date", name);
            return Ok(UpgradeOutcome::UpToDate { version: current });
        }

        log_info!("Downloading new version of {}.", name);
        let workdir = private_temp_dir()?;
        let bundle = self.fetcher.fetch(artifact, &latest, workdir.path())?;
        log_debug!("{} downloaded from {}", name, bundle.source_url);
        let binary = extract_binary(&bundle, name, workdir.path())?;
        let path = self
            .installer
            .install(&binary, &format!("{}-{}", name, latest), name)?;

        Ok(UpgradeOutcome::Installed { version: latest, path })
    }

    /// Version of the installed `name`, or empty when it is missing or cannot report a version.
    fn current_version(&self, name: &str) -> String {
        let link_path = &self.installer.target().link_path;
        let Some(binary) = VersionResolver::locate(name, link_path, self.search_path.as_ref()) else {
            log_debug!("{} not found on the search path", name);
            return String::new();
        };
        self.resolver.current_version(&binary).unwrap_or_else(|e| {
            log_debug!("Error getting version info for {} ({})", name, e);
            String::new()
        })
    }

    /// Brings the installer itself up to date, then makes sure the running copy is installed.
    ///
    /// The release index is only consulted when `check_latest` is set or when `running_exe` is
    /// already the installed copy. A failed lookup is logged and ignored.
    pub fn upgrade_self(
        &self,
        release_index: &str,
        running_version: &str,
        running_exe: &Path,
        check_latest: bool,
    ) -> Result<SelfUpgrade, InstallError> {
        let link = self.installer.target().link(&executable_name(SELF_NAME, &self.os));
        let from_installed = same_file(running_exe, &link);
        log_debug!(
            "testing {} against installed {} (installed copy: {})",
            running_exe.display(),
            link.display(),
            from_installed
        );

        if check_latest || from_installed {
            log_info!("Checking for newer version of {}.", SELF_NAME);
            let self_artifact = Artifact::new(SELF_NAME, release_index, &self_asset_name(&self.os))
                .with_layout(DownloadLayout::ReleaseTag);
            match self.self_resolver.latest_version(&self_artifact.latest_url()) {
                Err(e) => log_warn!("Error checking for latest version: {}", e),
                Ok(latest) if needs_upgrade(running_version, &latest) => {
                    return self.relaunch_latest(&self_artifact, &latest);
                }
                Ok(latest) => log_info!("{} is already up to date ({})", SELF_NAME, latest),
            }
        }

        let versioned_name = executable_name(&format!("{}-{}", SELF_NAME, running_version), &self.os);
        let versioned = self.installer.target().versioned_file(&versioned_name);
        if same_file(running_exe, &versioned) {
            log_debug!("{} is already installed at {}", SELF_NAME, versioned.display());
            return Ok(SelfUpgrade::AlreadyInstalled {
                version: running_version.to_string(),
            });
        }

        let path = self.installer.install(running_exe, &versioned_name, SELF_NAME)?;
        Ok(SelfUpgrade::Installed {
            version: running_version.to_string(),
            path,
        })
    }

    // Downloads the newer release and hands the rest of the run over to it.
    fn relaunch_latest(&self, self_artifact: &Artifact, latest: &str) -> Result<SelfUpgrade, InstallError> {
        log_info!("Downloading newer version of '{}': {}", SELF_NAME, latest);
        let workdir = private_temp_dir()?;
        let bundle = self.fetcher.fetch(self_artifact, latest, workdir.path())?;
        make_executable(&bundle.local_path)?;

        log_info!("Running install using newly downloaded '{}'", SELF_NAME);
        let downloaded = bundle.local_path.display().to_string();
        self.runner.run_local(&downloaded, self.relaunch_args.as_slice())?;
        Ok(SelfUpgrade::Relaunched {
            version: latest.to_string(),
        })
    }
}

fn private_temp_dir() -> Result<TempDir, InstallError> {
    Ok(tempfile::Builder::new().prefix("desktop").tempdir()?)
}

// Both paths resolve (through symlinks) to the same file.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
