// Our custom logging macros.
use crate::log_debug;
// For file system operations and the destination file.
use std::fs::{self, File};
// `std::io` contains core input/output functionalities and error types.
use std::io::{self, Read};
use std::path::Path;
// Used to set file permissions, specifically making files executable, which is a Unix-specific concept.
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Copies everything `reader` yields into a freshly created file at `dest` and makes it
/// executable. This is how a single archive member becomes a runnable binary.
///
/// # Returns
/// * `io::Result<u64>`: the number of bytes written.
pub fn write_executable<R: Read>(reader: &mut R, dest: &Path) -> io::Result<u64> {
    let mut out = File::create(dest)?;
    let written = io::copy(reader, &mut out)?;
    out.sync_all()?;
    drop(out);
    make_executable(dest)?;
    log_debug!("[Binary] Wrote {} bytes to {}", written, dest.display());
    Ok(written)
}

/// Makes a given file executable. On Unix-like systems, this is equivalent to `chmod 0755 file`.
///
/// # Arguments
/// * `path`: The path (`&Path`) to the file to make executable.
///
/// # Returns
/// * `io::Result<()>`: `io::Error` if permissions cannot be read or set.
#[cfg(unix)]
pub fn make_executable(path: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    // Owner: rwx, group and others: r-x.
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)
}

// On Windows, executable permissions come from the `.exe` extension, not from mode bits.
#[cfg(not(unix))]
pub fn make_executable(path: &Path) -> io::Result<()> {
    fs::metadata(path).map(|_| ())
}
