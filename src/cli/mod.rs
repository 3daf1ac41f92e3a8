// Command-line definitions for `desktop`.
pub mod cmd_enums;
