// Prints the version line of `desktop`.
// The line has the same `<name> version <ver>, build <commit>` shape every managed tool prints
// for `-v`, so an installed `desktop` can be version-checked like any other artifact.

/// Version of this build.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commit the binary was built from, injected at build time through `DESKTOP_COMMIT_HASH`.
pub fn build_commit() -> &'static str {
    option_env!("DESKTOP_COMMIT_HASH").unwrap_or("unknown")
}

pub fn version_line() -> String {
    format!("desktop version {}, build {}", VERSION, build_commit())
}

pub fn run() {
    println!("{}", version_line());
}
