// This is the main module file for the `utilities` directory.
// It declares the small helpers shared by the installer components.

// Writing extracted binaries and marking them executable.
pub mod binary;
// Configured path expansion.
pub mod path_helpers;
// OS detection and per-platform naming.
pub mod platform;
// `{{.Version}}` filename templates.
pub mod template;
