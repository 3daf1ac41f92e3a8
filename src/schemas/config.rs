// The installer configuration.
// Everything the components need to know about destinations, privilege elevation and the
// artifact list lives in one struct that is handed to them at construction time.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::libs::retry::RetryPolicy;
use crate::libs::utilities::path_helpers::expand_path;
use crate::schemas::artifact::{Artifact, InstallTarget};
use crate::{log_debug, log_info};

/// Release index of the installer itself.
pub const SELF_RELEASE_INDEX: &str = "https://github.com/SvenDowideit/desktop/releases";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Directory holding the immutable `<tool>-<version>` copies.
    pub versioned_path: String,
    /// Directory on the PATH that receives the `<tool>` symlinks.
    pub link_path: String,
    /// Directory for the verbose log files.
    pub log_dir: String,
    /// Command prepended to privileged steps. Empty runs them unwrapped.
    pub elevation: Vec<String>,
    /// Retry policy for the "latest version" lookup.
    pub latest_lookup: RetryPolicy,
    pub self_release_index: String,
    pub artifacts: Vec<Artifact>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        InstallerConfig::for_os(&crate::libs::utilities::platform::detect_os())
    }
}

impl InstallerConfig {
    /// Built-in defaults for one platform.
    pub fn for_os(os: &str) -> Self {
        let (versioned_path, link_path, log_dir, elevation) = if os == "windows" {
            (
                "${ALLUSERSPROFILE}/rancher/bin/",
                "${USERPROFILE}/bin/",
                "${ALLUSERSPROFILE}/rancher/logs/",
                Vec::new(),
            )
        } else {
            (
                "/usr/local/share/rancher/bin/",
                "/usr/local/bin/",
                "/usr/local/share/rancher/logs/",
                vec!["sudo".to_string()],
            )
        };
        InstallerConfig {
            versioned_path: versioned_path.to_string(),
            link_path: link_path.to_string(),
            log_dir: log_dir.to_string(),
            elevation,
            latest_lookup: RetryPolicy::default(),
            self_release_index: SELF_RELEASE_INDEX.to_string(),
            artifacts: default_artifacts(os),
        }
    }

    /// Reads a YAML configuration file. Missing keys fall back to the platform defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading configuration {}", path.display()))?;
        let config: InstallerConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing configuration {}", path.display()))?;
        log_debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Loads `explicit` when given, else `~/.desktop/config.yaml` when it exists, else the
    /// built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return InstallerConfig::load(path);
        }
        match crate::libs::paths::default_config_file() {
            Some(path) if path.is_file() => InstallerConfig::load(&path),
            _ => {
                log_debug!("No configuration file found, using built-in defaults");
                Ok(InstallerConfig::default())
            }
        }
    }

    /// Applies the `--binpath` / `--softlinkpath` overrides.
    pub fn with_overrides(mut self, binpath: Option<String>, softlinkpath: Option<String>) -> Self {
        if let Some(path) = binpath {
            log_info!("Installing tools into {}", path);
            self.versioned_path = path;
        }
        if let Some(path) = softlinkpath {
            log_info!("Linking tools from {}", path);
            self.link_path = path;
        }
        self
    }

    pub fn install_target(&self) -> InstallTarget {
        InstallTarget::new(expand_path(&self.versioned_path), expand_path(&self.link_path))
    }

    pub fn log_dir(&self) -> PathBuf {
        expand_path(&self.log_dir)
    }
}

/// The tools installed alongside the desktop on each platform.
pub fn default_artifacts(os: &str) -> Vec<Artifact> {
    match os {
        "macos" => vec![
            Artifact::new("docker", "https://get.docker.com/builds/Darwin/x86_64/", "docker-1.12.3.tgz"),
            Artifact::new("docker-machine", "https://github.com/docker/machine/releases", "docker-machine-Darwin-x86_64"),
            Artifact::new(
                "docker-machine-driver-xhyve",
                "https://github.com/zchee/docker-machine-driver-xhyve/releases",
                "docker-machine-driver-xhyve",
            ),
            Artifact::new("rancher", "https://github.com/rancher/cli/releases", "rancher-darwin-amd64-{{.Version}}.tar.gz"),
        ],
        "windows" => vec![
            Artifact::new("docker.exe", "https://get.docker.com/builds/Windows/x86_64/", "docker-1.12.3.zip"),
            Artifact::new("docker-machine", "https://github.com/docker/machine/releases", "docker-machine-Windows-x86_64.exe"),
            Artifact::new(
                "docker-machine-driver-vmware",
                "https://github.com/pecigonzalo/docker-machine-vmwareworkstation/releases",
                "docker-machine-driver-vmwareworkstation.exe",
            ),
            Artifact::new("rancher.exe", "https://github.com/rancher/cli/releases", "rancher-windows-amd64-{{.Version}}.zip"),
        ],
        _ => vec![Artifact::new(
            "docker",
            "https://get.docker.com/builds/Linux/x86_64/",
            "docker-1.12.3.tgz",
        )],
    }
}
