// Error types shared by the installer components.
// Every failure an artifact upgrade can hit is one variant of `InstallError`, so the
// per-artifact routine can log it and move on to the next artifact.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallError {
    /// DNS failure, refused connection, reset during a transfer.
    #[error("HTTP request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The server answered, but not with a 2xx.
    #[error("HTTP request to {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    /// The "latest" redirect did not end in a usable path segment.
    #[error("no version tag found at the end of {url}")]
    MissingVersionTag { url: String },

    /// Neither the semver nor the calendar-date reading applies to both strings.
    #[error("cannot compare versions (current: '{current}', latest: '{latest}')")]
    VersionComparison { current: String, latest: String },

    /// `<binary> -v` printed something we could not read a version from.
    #[error("failed to parse '{binary} -v' output ({output})")]
    VersionOutput { binary: String, output: String },

    #[error("malformed filename template '{template}': {reason}")]
    Template { template: String, reason: String },

    #[error("failed to find {member} in {}", archive.display())]
    MemberNotFound { member: String, archive: PathBuf },

    #[error("unable to read archive {}: {message}", archive.display())]
    Archive { archive: PathBuf, message: String },

    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// A command ran but exited non-zero. `stderr` holds its captured error output.
    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl InstallError {
    /// Converts a `ureq` failure into the transport / status variants.
    pub fn from_http(url: &str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, _) => InstallError::HttpStatus {
                url: url.to_string(),
                status,
            },
            ureq::Error::Transport(transport) => InstallError::Transport {
                url: url.to_string(),
                message: transport.to_string(),
            },
        }
    }

    /// Whether repeating the same request could reasonably succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            InstallError::Transport { .. } => true,
            InstallError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Parse-class failures: the upgrade is skipped rather than forced.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            InstallError::VersionComparison { .. }
                | InstallError::VersionOutput { .. }
                | InstallError::Template { .. }
                | InstallError::MissingVersionTag { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_not_found_names_member_and_archive() {
        let err = InstallError::MemberNotFound {
            member: "missing".to_string(),
            archive: PathBuf::from("/tmp/desktop123/tool-2.0.0"),
        };
        let message = err.to_string();
        assert!(message.contains("missing"));
        assert!(message.contains("/tmp/desktop123/tool-2.0.0"));
    }

    #[test]
    fn test_only_transport_and_server_errors_are_transient() {
        let transport = InstallError::Transport {
            url: "https://example.com".to_string(),
            message: "connection reset".to_string(),
        };
        let server = InstallError::HttpStatus {
            url: "https://example.com".to_string(),
            status: 502,
        };
        let not_found = InstallError::HttpStatus {
            url: "https://example.com".to_string(),
            status: 404,
        };
        assert!(transport.is_transient());
        assert!(server.is_transient());
        assert!(!not_found.is_transient());
        assert!(!InstallError::Io(io::Error::other("disk full")).is_transient());
    }
}
