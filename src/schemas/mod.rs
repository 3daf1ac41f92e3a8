// Data types describing what gets installed and how the installer is configured.
pub mod artifact;
pub mod config;
