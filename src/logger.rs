// This file implements the application's logging system.
// It keeps the crate-wide logging macros (INFO, WARN, ERROR, DEBUG) and routes them through
// `tracing`, so that a console sink and a verbose log file can both receive every event.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use colored::{ColoredString, Colorize};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, fmt};

/// Provides convenient logging macros.
/// `#[macro_export]` makes these macros globally available within the crate.
/// They accept everything the `tracing` macros accept, including fields such as `cmd = %label`.

// `log_info!` for general application progress and informational messages.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => (::tracing::info!($($arg)*));
}

// `log_warn!` for non-critical issues or noteworthy conditions.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => (::tracing::warn!($($arg)*));
}

// `log_error!` for critical errors requiring immediate attention.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => (::tracing::error!($($arg)*));
}

// `log_debug!` for detailed internal application tracing.
// Shown on the console only with `--debug`, always written to the verbose log file.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => (::tracing::debug!($($arg)*));
}

/// Console format: a colored level tag, then the message and its fields.
/// e.g. `[INFO] kubectl is already up to date`
struct LevelTagFormat;

impl<S, N> FormatEvent<S, N> for LevelTagFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(&self, ctx: &FmtContext<'_, S, N>, mut writer: Writer<'_>, event: &Event<'_>) -> std::fmt::Result {
        write!(writer, "{} ", level_tag(*event.metadata().level()))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

// TRACE shares the DEBUG tag.
fn level_tag(level: Level) -> ColoredString {
    match level {
        Level::ERROR => "[ERROR]".bright_red(),
        Level::WARN => "[WARN]".bright_yellow(),
        Level::INFO => "[INFO]".bright_green(),
        _ => "[DEBUG]".dimmed(),
    }
}

/// Initializes the logger.
/// This function should be called once at application startup.
///
/// # Arguments
/// * `debug`: If `true`, the console shows debug events; otherwise info and above.
/// * `log_dir`: Directory for the verbose log file. `None` disables the file sink.
///
/// # Returns
/// * The path of the verbose log file, when one was opened.
pub fn init(debug: bool, log_dir: Option<&Path>) -> Option<PathBuf> {
    let console_level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    // Each event is formatted into one buffer and written with a single call, so the two
    // reader threads of a running command never interleave the bytes of a line.
    let console = fmt::layer()
        .with_writer(io::stderr)
        .event_format(LevelTagFormat)
        .with_filter(console_level);

    let (file_layer, log_file) = match log_dir.map(open_verbose_log) {
        Some(Ok((file, path))) => {
            let layer = fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(LevelFilter::DEBUG);
            (Some(layer), Some(path))
        }
        Some(Err(e)) => {
            eprintln!("Unable to open verbose log file, continuing without it: {}", e);
            (None, None)
        }
        None => (None, None),
    };

    // `try_init` so a second call (or a test harness subscriber) is not fatal.
    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init();

    if let Some(path) = &log_file {
        eprintln!("Debug log written to {}", path.display());
    }
    log_debug!("START: {:?}", std::env::args().collect::<Vec<_>>());
    log_file
}

/// Creates `log_dir` when needed and opens `verbose-<YYYY-MM-DDTHH.MM>.log` inside it.
fn open_verbose_log(log_dir: &Path) -> io::Result<(File, PathBuf)> {
    fs::create_dir_all(log_dir)?;
    let path = log_dir.join(verbose_log_name(chrono::Local::now()));
    let file = fs::OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((file, path))
}

fn verbose_log_name<Tz: chrono::TimeZone>(now: chrono::DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("verbose-{}.log", now.format("%Y-%m-%dT%H.%M"))
}
