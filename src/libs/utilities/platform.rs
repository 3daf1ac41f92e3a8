// Platform detection and platform-specific naming rules.
use crate::log_warn;

/// Detects the current operating system as one of "macos", "linux", "windows"
/// (or the raw `std::env::consts::OS` value for anything else).
pub fn detect_os() -> String {
    normalize_os(std::env::consts::OS)
}

/// Normalizes the different spellings of an OS name into a consistent, lowercase form.
///
/// # Arguments
/// * `os`: An input string (`&str`) representing an OS (e.g., "macOS", "darwin", "Linux").
///
/// # Returns
/// * `String`: "macos", "linux" or "windows". Unknown values are returned lowercased.
pub fn normalize_os(os: &str) -> String {
    match os.to_lowercase().as_str() {
        "macos" | "darwin" | "osx" => "macos".to_string(),
        "linux" | "linux64" => "linux".to_string(),
        "windows" | "win32" | "win64" => "windows".to_string(),
        other => {
            log_warn!("[Platform] Unknown OS variant '{}', using as-is.", other);
            other.to_string()
        }
    }
}

/// Appends the executable suffix Windows requires, unless the name already carries it.
/// A no-op on every other platform.
pub fn executable_name(name: &str, os: &str) -> String {
    if os == "windows" && !name.to_lowercase().ends_with(".exe") {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

/// The asset name the installer's own releases use on each platform.
pub fn self_asset_name(os: &str) -> String {
    match os {
        "macos" => "desktop-osx".to_string(),
        "windows" => "desktop.exe".to_string(),
        _ => "desktop".to_string(),
    }
}
