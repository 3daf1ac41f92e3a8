//! # Artifact Fetcher
//!
//! Turns an [`Artifact`] plus a resolved version into a file on disk.
//!
//! 1. Expand the filename template with the version.
//! 2. Build the download URL for the artifact's layout.
//! 3. Stream the response body into a new file inside the caller's private temp directory.
//!
//! There is no retry and no resume: a failed download ends this artifact's attempt only.

use std::fs::File;
use std::io;
use std::path::Path;

use crate::libs::errors::InstallError;
use crate::libs::utilities::template::expand_filename_template;
use crate::schemas::artifact::{Artifact, DownloadedBundle};
use crate::{log_debug, log_error};

pub struct ArtifactFetcher {
    agent: ureq::Agent,
}

impl ArtifactFetcher {
    pub fn new(agent: ureq::Agent) -> Self {
        ArtifactFetcher { agent }
    }

    /// Downloads `artifact` at `version` into `dir`, as `<name>-<version>`.
    pub fn fetch(&self, artifact: &Artifact, version: &str, dir: &Path) -> Result<DownloadedBundle, InstallError> {
        let remote_filename = expand_filename_template(&artifact.filename_template, version)?;
        let source_url = artifact.download_url(version, &remote_filename);
        let local_path = dir.join(format!("{}-{}", artifact.name, version));

        self.download(&source_url, &local_path)?;

        Ok(DownloadedBundle {
            local_path,
            source_url,
            remote_filename,
        })
    }

    /// Streams `url` into a newly created file at `dest`.
    pub fn download(&self, url: &str, dest: &Path) -> Result<u64, InstallError> {
        log_debug!("Downloading {} into {}", url, dest.display());

        let response = self.agent.get(url).call().map_err(|e| {
            log_error!("HTTP request failed for {}: {}", url, e);
            InstallError::from_http(url, e)
        })?;

        let mut file = File::create(dest)?;
        let mut reader = response.into_reader();
        // A reset mid-body is a transport failure, not a local I/O one.
        let written = io::copy(&mut reader, &mut file).map_err(|e| InstallError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        file.sync_all()?;

        log_debug!("Downloaded {} bytes to {}", written, dest.display());
        Ok(written)
    }
}
