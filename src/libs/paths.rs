// Resolves where the optional configuration file lives.
use std::path::PathBuf;

use crate::libs::utilities::path_helpers::get_desktop_dir;
use crate::log_debug;

/// `~/.desktop/config.yaml`, or `None` when the home directory is unknown.
pub fn default_config_file() -> Option<PathBuf> {
    let path = get_desktop_dir()?.join("config.yaml");
    log_debug!("Default configuration file: {}", path.display());
    Some(path)
}
