// Data types describing what gets installed and where.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How a release source lays out its download URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DownloadLayout {
    /// `{release_index}/download/{version}/{filename}` (GitHub-style release pages).
    ReleaseTag,
    /// `{release_index}{filename}` (a plain file host).
    Direct,
}

impl DownloadLayout {
    /// GitHub release pages use the tagged layout; everything else is treated as a file host.
    pub fn infer(release_index: &str) -> Self {
        if release_index.starts_with("https://github.com/") {
            DownloadLayout::ReleaseTag
        } else {
            DownloadLayout::Direct
        }
    }
}

/// One installable tool and where to find its releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Bare tool name; also the name of the link placed on the PATH.
    pub name: String,
    /// Release index. `{release_index}/latest` must redirect to a URL ending in the version tag.
    pub release_index: String,
    /// Remote filename, optionally containing `{{.Version}}`.
    pub filename_template: String,
    /// Overrides the layout inferred from `release_index`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_layout: Option<DownloadLayout>,
}

impl Artifact {
    pub fn new(name: &str, release_index: &str, filename_template: &str) -> Self {
        Artifact {
            name: name.to_string(),
            release_index: release_index.to_string(),
            filename_template: filename_template.to_string(),
            download_layout: None,
        }
    }

    pub fn with_layout(mut self, layout: DownloadLayout) -> Self {
        self.download_layout = Some(layout);
        self
    }

    pub fn layout(&self) -> DownloadLayout {
        self.download_layout
            .unwrap_or_else(|| DownloadLayout::infer(&self.release_index))
    }

    /// URL whose redirect target names the latest release.
    pub fn latest_url(&self) -> String {
        format!("{}/latest", self.release_index)
    }

    /// Download URL of `filename` for `version`, according to the layout.
    pub fn download_url(&self, version: &str, filename: &str) -> String {
        match self.layout() {
            DownloadLayout::ReleaseTag => {
                format!("{}/download/{}/{}", self.release_index, version, filename)
            }
            DownloadLayout::Direct => format!("{}{}", self.release_index, filename),
        }
    }
}

/// A file sitting in a private temporary directory, holding exactly what the server returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedBundle {
    pub local_path: PathBuf,
    pub source_url: String,
    /// The expanded remote filename; its suffix selects the archive format.
    pub remote_filename: String,
}

/// The versioned storage directory and the PATH-visible link directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    pub versioned_path: PathBuf,
    pub link_path: PathBuf,
}

impl InstallTarget {
    pub fn new(versioned_path: impl Into<PathBuf>, link_path: impl Into<PathBuf>) -> Self {
        InstallTarget {
            versioned_path: versioned_path.into(),
            link_path: link_path.into(),
        }
    }

    pub fn versioned_file(&self, versioned_name: &str) -> PathBuf {
        self.versioned_path.join(versioned_name)
    }

    pub fn link(&self, bare_name: &str) -> PathBuf {
        self.link_path.join(bare_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_index_uses_release_tag_layout() {
        let rancher = Artifact::new(
            "rancher",
            "https://github.com/rancher/cli/releases",
            "rancher-darwin-amd64-{{.Version}}.tar.gz",
        );
        assert_eq!(rancher.layout(), DownloadLayout::ReleaseTag);
        assert_eq!(rancher.latest_url(), "https://github.com/rancher/cli/releases/latest");
        assert_eq!(
            rancher.download_url("v0.4.1", "rancher-darwin-amd64-v0.4.1.tar.gz"),
            "https://github.com/rancher/cli/releases/download/v0.4.1/rancher-darwin-amd64-v0.4.1.tar.gz"
        );
    }

    #[test]
    fn test_file_host_uses_direct_layout() {
        let docker = Artifact::new(
            "docker",
            "https://get.docker.com/builds/Darwin/x86_64/",
            "docker-1.12.3.tgz",
        );
        assert_eq!(docker.layout(), DownloadLayout::Direct);
        assert_eq!(
            docker.download_url("1.12.3", "docker-1.12.3.tgz"),
            "https://get.docker.com/builds/Darwin/x86_64/docker-1.12.3.tgz"
        );
    }

    #[test]
    fn test_explicit_layout_wins() {
        let tool = Artifact::new("tool", "http://127.0.0.1:8080/releases", "tool")
            .with_layout(DownloadLayout::ReleaseTag);
        assert_eq!(
            tool.download_url("2.0.0", "tool"),
            "http://127.0.0.1:8080/releases/download/2.0.0/tool"
        );
    }

    #[test]
    fn test_layout_deserializes_from_kebab_case() {
        let yaml = "name: tool\nrelease_index: http://mirror/\nfilename_template: tool\ndownload_layout: release-tag\n";
        let artifact: Artifact = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(artifact.layout(), DownloadLayout::ReleaseTag);
    }
}
