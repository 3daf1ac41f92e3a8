use clap::{Parser, Subcommand};

/// Defines the command-line interface (CLI) for 'desktop'.
/// `#[derive(Parser)]` automatically generates argument parsing code via `clap`.
#[derive(Parser)]
#[command(name = "desktop")]
#[command(about = "Install and keep up to date Rancher on the Desktop and its prerequisite tools")]
#[command(disable_version_flag = true)] // `-v` prints our own version line, the one the upgrade check parses
pub struct Cli {
    /// Enables detailed debug output for troubleshooting and development.
    #[arg(short, long, global = true)]
    pub(crate) debug: bool,

    /// Print the version and exit.
    #[arg(short = 'v', long = "version")]
    pub(crate) version: bool,

    /// Optional path to the installer configuration file (defaults to ~/.desktop/config.yaml).
    #[arg(long, global = true, env = "DESKTOP_CONFIG")]
    pub(crate) config: Option<String>,

    #[command(subcommand)]
    pub(crate) command: Option<Commands>,
}

/// Enumerates all supported subcommands with their specific arguments and options.
#[derive(Subcommand)]
pub enum Commands {
    /// Install/upgrade Rancher on the Desktop and its pre-req's into your PATH.
    Install {
        /// Destination directory to install tools to.
        #[arg(long)]
        binpath: Option<String>,
        /// Destination directory in PATH in which to create softlinks to tools.
        #[arg(long)]
        softlinkpath: Option<String>,
        /// Check for updated releases of `desktop` itself.
        #[arg(long, visible_alias = "upgrade")]
        update: bool,
    },
    /// Show the current Version of the tool.
    Version,
    /// Run a command and stream its output into the log.
    /// Useful to check elevation and remote access before an install.
    Run {
        /// Run the command behind the configured elevation prefix (sudo by default).
        #[arg(long, conflicts_with = "ssh")]
        sudo: bool,
        /// Run the command on this host over ssh (user@host).
        #[arg(long, value_name = "HOST")]
        ssh: Option<String>,
        /// Return as soon as a line containing this text is printed.
        #[arg(long, value_name = "PATTERN")]
        until: Option<String>,
        /// The command to run, followed by its arguments.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true, num_args = 1..)]
        command: Vec<String>,
    },
}
