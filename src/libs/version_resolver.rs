//! # Version Resolver
//!
//! Decides whether an installed tool is stale.
//!
//! Release tags come in two shapes: semantic versions (`v0.4.1`, `1.12.3`) and calendar dates
//! (`2016-11-30`). There is no ordering across the two, so a comparison is only attempted when
//! both sides share a shape. Anything else is treated as "cannot tell" and the upgrade is
//! skipped rather than forced.

use std::cmp::Ordering;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use semver::{BuildMetadata, Version};

use crate::libs::errors::InstallError;
use crate::libs::process_runner::ProcessRunner;
use crate::libs::retry::RetryPolicy;
use crate::{log_debug, log_warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Orders two version tags, semver first, then calendar dates.
pub fn compare_versions(current: &str, latest: &str) -> Result<Ordering, InstallError> {
    // Build metadata has no precedence.
    let parse_semver = |tag: &str| {
        Version::parse(tag.trim().trim_start_matches('v'))
            .ok()
            .map(|mut version| {
                version.build = BuildMetadata::EMPTY;
                version
            })
    };
    if let (Some(current_v), Some(latest_v)) = (parse_semver(current), parse_semver(latest)) {
        return Ok(latest_v.cmp(&current_v));
    }

    let parse_date = |tag: &str| NaiveDate::parse_from_str(tag.trim(), DATE_FORMAT).ok();
    if let (Some(current_d), Some(latest_d)) = (parse_date(current), parse_date(latest)) {
        return Ok(latest_d.cmp(&current_d));
    }

    Err(InstallError::VersionComparison {
        current: current.to_string(),
        latest: latest.to_string(),
    })
}

/// Whether `latest` should replace `current`. An empty `current` means "not installed" and
/// always needs the install; versions that cannot be compared are an error.
pub fn upgrade_decision(current: &str, latest: &str) -> Result<bool, InstallError> {
    if current.trim().is_empty() {
        return Ok(true);
    }
    Ok(compare_versions(current, latest)? == Ordering::Greater)
}

/// [`upgrade_decision`], with a failed comparison logged and answered with `false`.
pub fn needs_upgrade(current: &str, latest: &str) -> bool {
    upgrade_decision(current, latest).unwrap_or_else(|e| {
        log_warn!("Skipping upgrade: {}", e);
        false
    })
}

/// Takes the last path segment of the URL a "latest" request ended up at.
pub fn version_from_release_url(url: &str) -> Result<String, InstallError> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    match without_query.rsplit('/').next() {
        Some(tag) if !tag.is_empty() => Ok(tag.to_string()),
        _ => Err(InstallError::MissingVersionTag {
            url: url.to_string(),
        }),
    }
}

/// Reads the version out of `<binary> -v` output, e.g. `docker-machine version 0.8.2, build e18a919`.
/// Commas are dropped and the third whitespace-separated token is the version.
pub fn parse_version_output(binary: &str, output: &str) -> Result<String, InstallError> {
    let cleaned = output.trim().replace(',', "");
    cleaned
        .split_whitespace()
        .nth(2)
        .map(str::to_string)
        .ok_or_else(|| InstallError::VersionOutput {
            binary: binary.to_string(),
            output: output.trim().to_string(),
        })
}

/// Looks up latest and installed versions.
pub struct VersionResolver {
    agent: ureq::Agent,
    runner: ProcessRunner,
    retry: RetryPolicy,
}

impl VersionResolver {
    pub fn new(agent: ureq::Agent, runner: ProcessRunner, retry: RetryPolicy) -> Self {
        VersionResolver {
            agent,
            runner,
            retry,
        }
    }

    /// Follows the redirects of `{release_index}/latest` and reads the tag off the final URL.
    /// Network failures and 5xx answers are retried according to the policy.
    pub fn latest_version(&self, latest_url: &str) -> Result<String, InstallError> {
        let final_url = self.retry.run(
            |attempt| {
                log_debug!("GET {} (attempt {})", latest_url, attempt);
                self.agent
                    .get(latest_url)
                    .call()
                    .map(|response| response.get_url().to_string())
                    .map_err(|e| InstallError::from_http(latest_url, e))
            },
            InstallError::is_transient,
        )?;
        log_debug!("{} redirected to {}", latest_url, final_url);
        version_from_release_url(&final_url)
    }

    /// Finds `name` on `link_path` followed by `search_path` (the process `PATH` when `None`).
    pub fn locate(name: &str, link_path: &Path, search_path: Option<&OsString>) -> Option<PathBuf> {
        let rest = search_path
            .cloned()
            .or_else(|| std::env::var_os("PATH"))
            .unwrap_or_default();
        let mut dirs = vec![link_path.to_path_buf()];
        dirs.extend(std::env::split_paths(&rest).filter(|dir| !dir.as_os_str().is_empty()));
        let joined = std::env::join_paths(dirs).ok()?;
        let cwd = std::env::current_dir().ok()?;
        which::which_in(name, Some(joined), cwd).ok()
    }

    /// Runs `<binary> -v` and parses the version out of its standard output.
    pub fn current_version(&self, binary: &Path) -> Result<String, InstallError> {
        let shown = binary.display().to_string();
        let output = self.runner.run_local(&shown, &["-v"])?;
        parse_version_output(&shown, &output.stdout.join("\n"))
    }
}
