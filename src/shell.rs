//! The process-backed [`Shell`] collaborator.

use convergence::{CommandOutput, Error, Result, Shell, ShellCommand};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use subprocess::{Exec, ExitStatus, NullFile, Popen, Redirection};

/// Runs commands as child processes, optionally bounded by a timeout.
pub struct RealShell {
    timeout: Option<Duration>,
}

impl RealShell {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    fn resolve(program: &str) -> Result<PathBuf> {
        which::which(program)
            .map_err(|_| Error::MissingPrerequisite(format!("{program} not found in PATH")))
    }

    fn spawn(program: &Path, command: &ShellCommand) -> Result<Popen> {
        let exec = Exec::cmd(program)
            .args(command.args.as_slice())
            .stdout(Redirection::Pipe)
            .stderr(Redirection::Pipe);
        let exec = if command.stdin.is_some() {
            exec.stdin(Redirection::Pipe)
        } else {
            exec.stdin(NullFile)
        };
        exec.popen()
            .map_err(|e| Error::io(program, io::Error::other(e.to_string())))
    }

    fn timed_out(&self, popen: &mut Popen, command: &ShellCommand) -> Error {
        if let Err(e) = popen.kill() {
            log::warn!("Could not kill `{command}`: {e}");
        }
        // Reap the child; it has been signalled.
        if let Err(e) = popen.wait() {
            log::debug!("Could not reap `{command}`: {e}");
        }
        Error::ExternalCommandFailed {
            command: command.to_string(),
            status: -1,
            stderr: format!("timed out after {:?}", self.timeout.unwrap_or_default()),
        }
    }
}

impl Shell for RealShell {
    fn run(&self, command: &ShellCommand) -> Result<CommandOutput> {
        let program = Self::resolve(&command.program)?;
        log::debug!("exec {} ({})", command, program.display());
        let mut popen = Self::spawn(&program, command)?;

        // One deadline covers both reading the output and reaping the child.
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        let input = command.stdin.as_ref().map(|data| data.as_bytes().to_vec());
        let captured = {
            let mut communicator = popen.communicate_start(input);
            if let Some(deadline) = deadline {
                communicator = communicator.limit_time(remaining(deadline));
            }
            communicator.read()
        };
        let (stdout, stderr) = match captured {
            Ok(capture) => capture,
            Err(e) if e.error.kind() == io::ErrorKind::TimedOut => {
                return Err(self.timed_out(&mut popen, command));
            }
            Err(e) => return Err(Error::io(&program, e.error)),
        };

        let status = match deadline {
            Some(deadline) => popen
                .wait_timeout(remaining(deadline))
                .map_err(|e| Error::io(&program, io::Error::other(e.to_string())))?,
            None => Some(
                popen
                    .wait()
                    .map_err(|e| Error::io(&program, io::Error::other(e.to_string())))?,
            ),
        };
        let Some(status) = status else {
            return Err(self.timed_out(&mut popen, command));
        };

        let output = CommandOutput {
            stdout: lossy(stdout),
            stderr: lossy(stderr),
            status: exit_code(status),
        };
        log::trace!("`{command}` exited with {}", output.status);
        Ok(output)
    }
}

/// Time left before `deadline`, zero once it has passed.
fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

fn lossy(bytes: Option<Vec<u8>>) -> String {
    bytes
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .unwrap_or_default()
}

/// Exit code; -1 for signals and undetermined statuses.
fn exit_code(status: ExitStatus) -> i32 {
    match status {
        ExitStatus::Exited(code) => code as i32,
        _ => -1,
    }
}
