// The installer's building blocks, leaves first.

// Error taxonomy shared by every component.
pub mod errors;
// Bounded retry with backoff.
pub mod retry;
// Runs external commands and streams their output into the log.
pub mod process_runner;
// Latest/current version lookup and comparison.
pub mod version_resolver;
// Downloads release bundles.
pub mod artifact_fetcher;
// Pulls one binary out of a bundle.
pub mod archive_extractor;
// Platform specific steps around an install.
pub mod install_hooks;
// Versioned copy + symlink installs.
pub mod atomic_installer;
// Per-artifact upgrade routine and self-upgrade.
pub mod upgrader;
// Default configuration file location.
pub mod paths;
pub mod utilities;
