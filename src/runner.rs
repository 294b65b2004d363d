use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use tracing::{debug, info, warn};

use crate::error::{ExternalToolError, Result, ToolFailure};

/// Executes the external toolkit binary.
///
/// One-shot invocations block until the process exits and capture its output;
/// long-lived invocations hand back the running child with its stdin and stdout.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    working_dir: Option<PathBuf>,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            working_dir: None,
        }
    }

    /// Runs every process with `dir` as its working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command<I, S>(&self, args: I) -> (Command, String)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        let line = command_line(&self.program, &args);
        let mut cmd = Command::new(&self.program);
        cmd.args(&args);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        (cmd, line)
    }

    /// Runs the toolkit to completion and returns its combined output.
    ///
    /// Stdout and stderr share one pipe, so the returned text keeps the order
    /// in which the toolkit wrote it. A spawn failure or a non-zero exit
    /// becomes an [`ExternalToolError`] carrying that text; on success the
    /// text is logged.
    pub fn run<I, S>(&self, operation: &str, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let setup = |e: std::io::Error| ExternalToolError::setup(operation, e);
        let (mut cmd, line) = self.command(args);
        debug!(command = %line, "running external tool");

        let (mut reader, writer) = std::io::pipe().map_err(setup)?;
        let stderr = writer.try_clone().map_err(setup)?;
        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr)
            .spawn()
            .map_err(setup)?;
        // The command still holds write ends; the reader sees EOF only once they are closed.
        drop(cmd);

        let mut raw = Vec::new();
        let read = reader.read_to_end(&mut raw);
        let status = child.wait().map_err(setup)?;
        read.map_err(setup)?;
        let combined = String::from_utf8_lossy(&raw).into_owned();

        if !status.success() {
            warn!(command = %line, status = %status, "external tool failed");
            return Err(ExternalToolError::new(
                operation,
                ToolFailure::ExitStatus(status),
                combined,
            ));
        }

        info!(command = %line, "{}", combined);
        Ok(combined)
    }

    /// Starts the toolkit without waiting for it.
    ///
    /// Stdout is requested before stdin; stderr is discarded. If either pipe is
    /// missing after spawning, the child is killed and reaped before the error
    /// is returned.
    pub fn spawn_piped<I, S>(
        &self,
        operation: &str,
        args: I,
    ) -> Result<(Child, ChildStdin, ChildStdout)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (mut cmd, line) = self.command(args);
        debug!(command = %line, "spawning external tool");

        let mut child = cmd
            .stdout(Stdio::piped())
            .stdin(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ExternalToolError::setup(operation, e))?;

        let pipes = match (child.stdout.take(), child.stdin.take()) {
            (Some(stdout), Some(stdin)) => Ok((stdin, stdout)),
            (None, _) => Err(ToolFailure::MissingPipe("stdout")),
            (_, None) => Err(ToolFailure::MissingPipe("stdin")),
        };

        match pipes {
            Ok((stdin, stdout)) => {
                info!(command = %line, pid = child.id(), "external tool started");
                Ok((child, stdin, stdout))
            }
            Err(failure) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(ExternalToolError::setup(operation, failure))
            }
        }
    }
}

fn command_line(program: &Path, args: &[OsString]) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}
