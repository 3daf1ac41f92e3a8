// Register application subcommands.
// Each module corresponds to a specific `desktop` command-line action.

// Installs or upgrades `desktop` and every configured tool.
pub mod install;
// Runs a single command locally, elevated or over ssh.
pub mod run;
// Displays the version of desktop
pub mod version;
