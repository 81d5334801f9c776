use core::fmt;
use std::{
    borrow::Cow,
    ffi::{OsStr, OsString},
    fmt::Debug,
    process::{ExitStatus, Stdio},
};

use bstr::ByteSlice;
use stacked_errors::{Result, StackableErr};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    process,
    task::{self, JoinHandle},
};

use crate::next_terminal_color;

/// An OS Command, this is `tokio::process::Command` wrapped with recording and
/// forwarding of the standard streams.
///
/// If neither `recording` nor `debug` is set, the child inherits the standard
/// streams of this process (including stdin), which is what attached
/// container runs need.
#[derive(Clone)]
pub struct Command {
    /// The program to run
    pub program: OsString,
    /// All the arguments that will be passed to the program
    pub args: Vec<OsString>,
    /// Set to true by default, records stdout and stderr into the
    /// `CommandResult`
    pub recording: bool,
    /// Forward stdout and stderr to the current process stdout and stderr,
    /// each line prefixed
    pub debug: bool,
    /// Overrides the default line prefix used when `debug` is set
    pub debug_line_prefix: Option<String>,
}

impl Default for Command {
    fn default() -> Self {
        Self {
            program: Default::default(),
            args: Default::default(),
            recording: true,
            debug: false,
            debug_line_prefix: None,
        }
    }
}

impl Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("Command {{ {:?}", self.get_unified_command()))?;
        if !self.recording {
            f.write_fmt(format_args!(", recording: false"))?;
        }
        if self.debug {
            f.write_fmt(format_args!(", debug: true"))?;
        }
        f.write_fmt(format_args!(" }}"))
    }
}

impl Command {
    /// Creates a `Command` for `program` with no arguments. The program is
    /// used as is, a path containing spaces is not split.
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().into(),
            ..Default::default()
        }
    }

    /// Adds arguments to be passed to the program
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().into()));
        self
    }

    /// Sets `recording`
    pub fn recording(mut self, recording: bool) -> Self {
        self.recording = recording;
        self
    }

    /// Sets `debug`
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Changes the debug line prefix. If `None`, then the program name and
    /// process ID are used.
    pub fn debug_line_prefix(mut self, line_prefix: Option<String>) -> Self {
        self.debug_line_prefix = line_prefix;
        self
    }

    /// Gets the program and args interspersed with spaces
    pub fn get_unified_command(&self) -> String {
        let mut command = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            command.push(' ');
            command += arg.to_string_lossy().as_ref();
        }
        command
    }

    /// Runs the command and waits for it to complete. Note: if this function
    /// succeeds, it only means that the OS calls all succeeded, it does not
    /// mean that the command itself had a successful return status, check
    /// [CommandResult::successful].
    pub async fn run_to_completion(self) -> Result<CommandResult> {
        let piped = self.recording || self.debug;
        let mut cmd = process::Command::new(&self.program);
        cmd.args(&self.args).kill_on_drop(true);
        if piped {
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
        } else {
            cmd.stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        }
        let mut child = cmd.spawn().stack_err_with_locationless(|| {
            format!("{self:?}.run_to_completion() -> failed to spawn child process")
        })?;

        let mut handles: Vec<JoinHandle<Result<Vec<u8>>>> = vec![];
        if piped {
            let (stdout_prefix, stderr_prefix) = self.line_prefixes(child.id());
            let stdout = child
                .stdout
                .take()
                .stack_err_locationless("Command::run_to_completion -> stdout was not piped")?;
            let stderr = child
                .stderr
                .take()
                .stack_err_locationless("Command::run_to_completion -> stderr was not piped")?;
            handles.push(task::spawn(recorder(
                stdout,
                self.recording,
                self.debug.then(|| (tokio::io::stdout(), stdout_prefix)),
            )));
            handles.push(task::spawn(recorder(
                stderr,
                self.recording,
                self.debug.then(|| (tokio::io::stderr(), stderr_prefix)),
            )));
        }

        let status = child.wait().await.stack_err_with_locationless(|| {
            format!("{self:?}.run_to_completion() -> failed when waiting on child process")
        })?;
        let mut records = Vec::with_capacity(2);
        for handle in handles {
            let record = handle
                .await
                .stack_err_with_locationless(|| {
                    format!("{self:?}.run_to_completion() -> recording task panicked")
                })?
                .stack_err_with_locationless(|| {
                    format!("{self:?}.run_to_completion() -> recording failed")
                })?;
            records.push(record);
        }
        let stderr = records.pop().unwrap_or_default();
        let stdout = records.pop().unwrap_or_default();
        Ok(CommandResult {
            command: self,
            status: Some(status),
            stdout,
            stderr,
        })
    }

    fn line_prefixes(&self, child_id: Option<u32>) -> (String, String) {
        if let Some(prefix) = &self.debug_line_prefix {
            return (prefix.clone(), prefix.clone())
        }
        let terminal_color = if self.debug {
            next_terminal_color()
        } else {
            owo_colors::AnsiColors::Default
        };
        let program_name = self.program.to_string_lossy();
        let child_id = child_id.unwrap_or_default();
        (
            owo_colors::OwoColorize::color(
                &format!("{program_name} {child_id}  | "),
                terminal_color,
            )
            .to_string(),
            owo_colors::OwoColorize::color(
                &format!("{program_name} {child_id} E| "),
                terminal_color,
            )
            .to_string(),
        )
    }
}

/// Reads `std_read` line by line until EOF, recording the raw bytes if
/// `record` is set and writing each line with its prefix to the forward
/// target. Lines that are not valid UTF-8 get replacement characters when
/// forwarded, the record keeps the original bytes.
async fn recorder<R: AsyncRead + Unpin, W: AsyncWrite + Unpin>(
    std_read: R,
    record: bool,
    mut std_forward: Option<(W, String)>,
) -> Result<Vec<u8>> {
    let mut std_read = BufReader::new(std_read);
    let mut recorded = vec![];
    let mut line = vec![];
    let mut line_buf = vec![];
    loop {
        line.clear();
        let bytes_read = std_read
            .read_until(b'\n', &mut line)
            .await
            .stack_err_locationless("recorder -> failed on read")?;
        if bytes_read == 0 {
            break
        }
        if record {
            recorded.extend_from_slice(&line);
        }
        if let Some((ref mut std_forward, ref prefix)) = std_forward {
            // the prefix is written together with the line, otherwise stdout
            // and stderr lines of the same child run into each other
            line_buf.clear();
            line_buf.extend_from_slice(prefix.as_bytes());
            line_buf.extend_from_slice(line.to_str_lossy().as_bytes());
            if line.last() != Some(&b'\n') {
                line_buf.push(b'\n');
            }
            std_forward
                .write_all(&line_buf)
                .await
                .stack_err_locationless("recorder -> failed on forwarding write")?;
            std_forward
                .flush()
                .await
                .stack_err_locationless("recorder -> failed on forwarding flush")?;
        }
    }
    Ok(recorded)
}

/// The result of a [Command](crate::Command)
#[must_use]
#[derive(Clone, Default)]
pub struct CommandResult {
    // the command information is kept around for failures
    pub command: Command,
    pub status: Option<ExitStatus>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl Debug for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!(
            "CommandResult {{\ncommand: {:?},\nstatus: {:?},\n",
            self.command, self.status
        ))?;
        let stdout = self.stdout_as_utf8_lossy();
        if !stdout.is_empty() {
            f.write_fmt(format_args!("stdout: {}\n,", stdout))?;
        }
        let stderr = self.stderr_as_utf8_lossy();
        if !stderr.is_empty() {
            f.write_fmt(format_args!("stderr: {}\n,", stderr))?;
        }
        f.write_fmt(format_args!("}}"))
    }
}

impl CommandResult {
    /// Returns if the command completed with a successful return status
    pub fn successful(&self) -> bool {
        self.status.as_ref().is_some_and(|status| status.success())
    }

    /// Returns the exit code, `None` if the process was ended by a signal or
    /// never completed
    pub fn code(&self) -> Option<i32> {
        self.status.as_ref().and_then(|status| status.code())
    }

    /// Returns `String::from_utf8_lossy(&self.stdout)`
    pub fn stdout_as_utf8_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    /// Returns `String::from_utf8_lossy(&self.stderr)`
    pub fn stderr_as_utf8_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}
