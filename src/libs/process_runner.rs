//! # Process Runner
//!
//! Executes one external command and streams both of its output pipes into the log while it
//! runs. Every shell-level side effect of the installer goes through here: version checks,
//! privileged filesystem steps, and commands sent over a remote shell.
//!
//! ## Execution modes
//!
//! - **Local**: a plain subprocess.
//! - **LocalPrivileged**: the same command behind the configured elevation prefix (`sudo`).
//! - **Remote**: the command is handed to a [`RemoteShell`] transport.
//!
//! All three end up as a pair of byte streams plus a [`Session`] to wait on, and share the
//! same draining and halt-pattern logic.

use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use crate::libs::errors::InstallError;
use crate::{log_debug, log_error, log_info};

/// The two output streams of a started command.
pub struct OutputStreams {
    pub stdout: Box<dyn Read + Send>,
    pub stderr: Box<dyn Read + Send>,
}

/// A started command that can be waited on.
pub trait Session: Send {
    /// Blocks until the command ends. Returns its exit code, `None` when it had none
    /// (killed by a signal, or the transport does not report one).
    fn wait(self: Box<Self>) -> io::Result<Option<i32>>;
}

/// A transport able to run a command line somewhere else (typically over ssh).
pub trait RemoteShell {
    fn start(&self, command: &str) -> io::Result<(OutputStreams, Box<dyn Session>)>;
}

/// How a command is executed.
#[derive(Clone, Copy)]
pub enum ExecMode<'a> {
    Local,
    LocalPrivileged,
    Remote(&'a dyn RemoteShell),
}

/// One external command execution.
pub struct ProcessInvocation<'a> {
    pub command: String,
    pub args: Vec<String>,
    pub mode: ExecMode<'a>,
    /// Stop waiting as soon as a line containing this substring is seen.
    pub halt_pattern: Option<String>,
}

impl<'a> ProcessInvocation<'a> {
    pub fn new<S: AsRef<str>>(command: &str, args: &[S], mode: ExecMode<'a>) -> Self {
        ProcessInvocation {
            command: command.to_string(),
            args: args.iter().map(|a| a.as_ref().to_string()).collect(),
            mode,
            halt_pattern: None,
        }
    }

    pub fn until(mut self, pattern: &str) -> Self {
        self.halt_pattern = Some(pattern.to_string()).filter(|p| !p.is_empty());
        self
    }

    /// The command line as shown in logs. Not quoted; never hand it to a shell.
    pub fn command_line(&self) -> String {
        self.words().collect::<Vec<_>>().join(" ")
    }

    /// The command line as sent to a remote shell, every word quoted so the remote side
    /// sees the same argument boundaries a local run would.
    pub fn shell_command_line(&self) -> io::Result<String> {
        shlex::try_join(self.words()).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
    }

    fn words(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.command.as_str()).chain(self.args.iter().map(String::as_str))
    }
}

/// What a finished (or halted) command produced.
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    /// Exit code; `None` when halted early or when none was reported.
    pub exit_code: Option<i32>,
    /// `true` when the call returned because the halt pattern was seen.
    pub halted: bool,
}

/// Subprocess session backed by `std::process::Child`.
pub struct LocalSession(Child);

impl Session for LocalSession {
    fn wait(mut self: Box<Self>) -> io::Result<Option<i32>> {
        Ok(self.0.wait()?.code())
    }
}

/// Spawns `program args...` with both output pipes captured.
pub fn spawn_piped(program: &str, args: &[String]) -> io::Result<(OutputStreams, Box<dyn Session>)> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("stdout pipe was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("stderr pipe was not captured"))?;
    Ok((
        OutputStreams {
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
        },
        Box::new(LocalSession(child)),
    ))
}

/// Remote shell that runs commands through the local `ssh` binary.
pub struct SshShell {
    pub destination: String,
    pub options: Vec<String>,
}

impl SshShell {
    pub fn new(destination: &str) -> Self {
        SshShell {
            destination: destination.to_string(),
            options: Vec::new(),
        }
    }
}

impl RemoteShell for SshShell {
    fn start(&self, command: &str) -> io::Result<(OutputStreams, Box<dyn Session>)> {
        let mut args = self.options.clone();
        args.push(self.destination.clone());
        args.push(command.to_string());
        spawn_piped("ssh", &args)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    fn name(self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

enum ReaderEvent {
    Halted,
    Finished(StreamKind, io::Result<()>),
}

/// Runs commands in any of the three modes.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    /// Prepended to `LocalPrivileged` commands. Empty runs them unwrapped.
    elevation: Vec<String>,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        ProcessRunner::new(vec!["sudo".to_string()])
    }
}

impl ProcessRunner {
    pub fn new(elevation: Vec<String>) -> Self {
        ProcessRunner { elevation }
    }

    /// Runs a plain local command.
    pub fn run_local<S: AsRef<str>>(&self, command: &str, args: &[S]) -> Result<RunOutput, InstallError> {
        self.run(&ProcessInvocation::new(command, args, ExecMode::Local))
    }

    /// Runs a local command behind the elevation prefix.
    pub fn run_privileged<S: AsRef<str>>(&self, command: &str, args: &[S]) -> Result<RunOutput, InstallError> {
        self.run(&ProcessInvocation::new(command, args, ExecMode::LocalPrivileged))
    }

    /// Executes `invocation`, forwarding every output line to the log as it arrives.
    ///
    /// Returns once the command exits, or as soon as a line containing the halt pattern is
    /// seen on either stream (the command is then left running). A non-zero exit becomes
    /// `InstallError::CommandFailed` carrying the captured stderr.
    pub fn run(&self, invocation: &ProcessInvocation<'_>) -> Result<RunOutput, InstallError> {
        let label = invocation.command_line();
        log_debug!("Run {}", label);

        let (streams, session) = self.start(invocation).map_err(|source| {
            log_error!(cmd = %label, "{}", source);
            InstallError::Spawn {
                command: label.clone(),
                source,
            }
        })?;

        let stdout_lines = Arc::new(Mutex::new(Vec::new()));
        let stderr_lines = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = mpsc::channel();

        spawn_reader(
            StreamKind::Stdout,
            streams.stdout,
            &label,
            invocation.halt_pattern.clone(),
            Arc::clone(&stdout_lines),
            tx.clone(),
        )?;
        spawn_reader(
            StreamKind::Stderr,
            streams.stderr,
            &label,
            invocation.halt_pattern.clone(),
            Arc::clone(&stderr_lines),
            tx,
        )?;

        // Ends when both readers have dropped their sender, or on the first halt.
        let mut halted = false;
        for event in rx {
            match event {
                ReaderEvent::Halted => {
                    halted = true;
                    break;
                }
                ReaderEvent::Finished(kind, Err(e)) => {
                    log_error!(cmd = %label, "Error reading {}: {}", kind.name(), e);
                }
                ReaderEvent::Finished(_, Ok(())) => {}
            }
        }

        if halted {
            log_debug!(cmd = %label, "Halt pattern seen, not waiting for the command to exit");
            return Ok(RunOutput {
                stdout: snapshot(&stdout_lines),
                stderr: snapshot(&stderr_lines),
                exit_code: None,
                halted: true,
            });
        }

        let exit_code = session.wait()?;
        let output = RunOutput {
            stdout: snapshot(&stdout_lines),
            stderr: snapshot(&stderr_lines),
            exit_code,
            halted: false,
        };
        if exit_code == Some(0) {
            return Ok(output);
        }

        let status = match exit_code {
            Some(code) => format!("exit status {}", code),
            None => "terminated without an exit status".to_string(),
        };
        log_error!(cmd = %label, "{}", status);
        Err(InstallError::CommandFailed {
            command: label,
            status,
            stderr: output.stderr.join("\n"),
        })
    }

    /// Dispatches an invocation to its execution strategy.
    fn start(&self, invocation: &ProcessInvocation<'_>) -> io::Result<(OutputStreams, Box<dyn Session>)> {
        match invocation.mode {
            ExecMode::Local => spawn_piped(&invocation.command, &invocation.args),
            ExecMode::LocalPrivileged => match self.elevation.split_first() {
                Some((program, prefix)) => {
                    let mut args = prefix.to_vec();
                    args.push(invocation.command.clone());
                    args.extend(invocation.args.iter().cloned());
                    spawn_piped(program, &args)
                }
                None => spawn_piped(&invocation.command, &invocation.args),
            },
            ExecMode::Remote(shell) => shell.start(&invocation.shell_command_line()?),
        }
    }
}

/// Starts the thread draining one stream line by line.
fn spawn_reader(
    kind: StreamKind,
    stream: Box<dyn Read + Send>,
    label: &str,
    halt_pattern: Option<String>,
    captured: Arc<Mutex<Vec<String>>>,
    events: mpsc::Sender<ReaderEvent>,
) -> Result<(), InstallError> {
    let label = label.to_string();
    thread::Builder::new()
        .name(format!("{}-reader", kind.name()))
        .spawn(move || {
            let result = drain(kind, stream, &label, halt_pattern.as_deref(), &captured, &events);
            // The receiver is gone after a halt; nothing left to report to.
            let _ = events.send(ReaderEvent::Finished(kind, result));
        })?;
    Ok(())
}

fn drain(
    kind: StreamKind,
    stream: Box<dyn Read + Send>,
    label: &str,
    halt_pattern: Option<&str>,
    captured: &Mutex<Vec<String>>,
    events: &mpsc::Sender<ReaderEvent>,
) -> io::Result<()> {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf)
            .trim_end_matches(['\n', '\r'])
            .to_string();
        log_info!(cmd = %label, stream = kind.name(), "{}", line);

        let matched = halt_pattern.is_some_and(|p| line.contains(p));
        captured
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line);
        if matched {
            log_debug!(cmd = %label, "Exiting, found '{}'", halt_pattern.unwrap_or_default());
            let _ = events.send(ReaderEvent::Halted);
            return Ok(());
        }
    }
}

fn snapshot(lines: &Mutex<Vec<String>>) -> Vec<String> {
    lines
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    /// Stands in for an ssh transport by running the command line under `sh -c`.
    struct ShellTransport {
        started: Mutex<Vec<String>>,
    }

    impl RemoteShell for ShellTransport {
        fn start(&self, command: &str) -> io::Result<(OutputStreams, Box<dyn Session>)> {
            self.started.lock().unwrap().push(command.to_string());
            spawn_piped("sh", &["-c".to_string(), command.to_string()])
        }
    }

    fn unprivileged() -> ProcessRunner {
        ProcessRunner::new(Vec::new())
    }

    #[test]
    fn test_captures_both_streams() {
        let output = unprivileged()
            .run_local("sh", &["-c", "echo out-1; echo err-1 >&2; echo out-2"])
            .unwrap();
        assert_eq!(output.stdout, vec!["out-1", "out-2"]);
        assert_eq!(output.stderr, vec!["err-1"]);
        assert_eq!(output.exit_code, Some(0));
        assert!(!output.halted);
    }

    #[test]
    fn test_halt_pattern_returns_before_exit() {
        let started = Instant::now();
        let invocation = ProcessInvocation::new(
            "sh",
            &["-c", "echo booting; echo READY; sleep 30; echo extra"],
            ExecMode::Local,
        )
        .until("READY");

        let output = unprivileged().run(&invocation).unwrap();

        assert!(output.halted);
        assert_eq!(output.stdout, vec!["booting", "READY"]);
        assert!(started.elapsed() < Duration::from_secs(20));
    }

    #[test]
    fn test_halt_pattern_on_stderr() {
        let invocation = ProcessInvocation::new(
            "sh",
            &["-c", "echo starting; echo 'server READY' >&2; sleep 30"],
            ExecMode::Local,
        )
        .until("READY");

        let output = unprivileged().run(&invocation).unwrap();
        assert!(output.halted);
        assert_eq!(output.stderr, vec!["server READY"]);
    }

    #[test]
    fn test_without_pattern_waits_for_exit() {
        let output = unprivileged()
            .run_local("sh", &["-c", "echo READY; sleep 1; echo extra"])
            .unwrap();
        assert_eq!(output.stdout, vec!["READY", "extra"]);
        assert!(!output.halted);
    }

    #[test]
    fn test_nonzero_exit_carries_stderr() {
        let err = unprivileged()
            .run_local("sh", &["-c", "echo 'permission denied' >&2; exit 3"])
            .unwrap_err();
        match err {
            InstallError::CommandFailed { command, status, stderr } => {
                assert!(command.starts_with("sh -c"));
                assert!(status.contains('3'));
                assert_eq!(stderr, "permission denied");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let err = unprivileged()
            .run_local("definitely-not-a-real-program-4711", &["-v"])
            .unwrap_err();
        assert!(matches!(err, InstallError::Spawn { .. }));
    }

    #[test]
    fn test_privileged_mode_wraps_with_elevation_prefix() {
        // `env` as the elevation program runs the wrapped command unchanged.
        let runner = ProcessRunner::new(vec!["env".to_string()]);
        let output = runner.run_privileged("echo", &["elevated"]).unwrap();
        assert_eq!(output.stdout, vec!["elevated"]);
    }

    #[test]
    fn test_remote_mode_uses_transport() {
        let transport = ShellTransport {
            started: Mutex::new(Vec::new()),
        };
        let invocation = ProcessInvocation::new(
            "sh",
            &["-c", "echo booting; echo READY; sleep 30"],
            ExecMode::Remote(&transport),
        )
        .until("READY");

        let output = unprivileged().run(&invocation).unwrap();

        assert!(output.halted);
        assert_eq!(output.stdout, vec!["booting", "READY"]);
        let started = transport.started.lock().unwrap();
        assert_eq!(started.len(), 1);
        assert!(started[0].starts_with("sh -c "));
    }

    #[test]
    fn test_remote_arguments_keep_their_boundaries() {
        let transport = ShellTransport {
            started: Mutex::new(Vec::new()),
        };
        let invocation = ProcessInvocation::new(
            "printf",
            &["%s\\n", "a b; echo INJECTED", "$HOME"],
            ExecMode::Remote(&transport),
        );

        let output = unprivileged().run(&invocation).unwrap();

        assert_eq!(output.stdout, vec!["a b; echo INJECTED", "$HOME"]);
        assert_eq!(invocation.command_line(), "printf %s\\n a b; echo INJECTED $HOME");
    }

    #[test]
    fn test_nul_byte_cannot_be_sent_remotely() {
        let invocation = ProcessInvocation::new("echo", &["a\0b"], ExecMode::Local);
        assert!(invocation.shell_command_line().is_err());
    }
}
