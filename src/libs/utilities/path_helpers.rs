// Path expansion helpers used when reading configured directories.
use crate::log_warn;
use std::path::PathBuf;

/// Expands `~`, `$VAR` and `${VAR}` in a configured path.
/// Configuration written for Windows uses `${ALLUSERSPROFILE}` and `${USERPROFILE}`.
///
/// # Arguments
/// * `path`: The raw path string from the configuration or the command line.
///
/// # Returns
/// * `PathBuf`: The expanded path. When a variable is undefined the path is returned with only
///   the tilde expanded, and a warning is logged.
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            log_warn!("[Paths] Could not expand '{}': {}. Using it with only '~' expanded.", path, e);
            PathBuf::from(shellexpand::tilde(path).as_ref())
        }
    }
}

/// Returns the per-user settings directory, `~/.desktop`.
/// `None` when the home directory cannot be determined.
pub fn get_desktop_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".desktop"))
}
