//! Collaborator and callback traits
//!
//! Providers observe and mutate the system only through [`Shell`] and
//! [`FileSystem`], so the engine never depends on a process or file
//! implementation directly. The binary supplies real implementations; tests
//! use the fakes in `testing`.

use crate::error::{Error, Result};
use crate::resource::{Resource, Snapshot};
use crate::types::{CommandOutput, ResourceFailure, ResourceOutcome, RunSummary, ShellCommand};
use std::path::{Path, PathBuf};

/// Synchronous command execution.
pub trait Shell: Send + Sync {
    /// Run a command and return its output, whatever the exit status.
    fn run(&self, command: &ShellCommand) -> Result<CommandOutput>;

    /// Run a command, failing unless its status is in `command.returns`.
    fn run_checked(&self, command: &ShellCommand) -> Result<CommandOutput> {
        let output = self.run(command)?;
        if !command.accepts(output.status) {
            return Err(Error::ExternalCommandFailed {
                command: command.to_string(),
                status: output.status,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }

    /// Run a checked command and capture stdout.
    fn run_capture(&self, command: &ShellCommand) -> Result<String> {
        Ok(self.run_checked(command)?.stdout)
    }
}

/// Whole-file filesystem access.
pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> Result<String>;

    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Resolve symlinks to a canonical path.
    fn realpath(&self, path: &Path) -> Result<PathBuf>;

    /// Replace `path` with `contents` via a temporary file and rename.
    fn write_atomic(&self, path: &Path, contents: &str) -> Result<()>;

    fn remove(&self, path: &Path) -> Result<()>;

    /// Append through a read-modify-atomic-replace so readers never see a
    /// partial line.
    fn append(&self, path: &Path, contents: &str) -> Result<()> {
        let mut current = if self.exists(path) {
            self.read_to_string(path)?
        } else {
            String::new()
        };
        if !current.is_empty() && !current.ends_with('\n') {
            current.push('\n');
        }
        current.push_str(contents);
        self.write_atomic(path, &current)
    }

    /// Read a file, treating a missing file as empty.
    fn read_optional(&self, path: &Path) -> Result<Option<String>> {
        if self.exists(path) {
            self.read_to_string(path).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// The collaborators a provider is allowed to touch.
#[derive(Clone, Copy)]
pub struct System<'a> {
    pub shell: &'a dyn Shell,
    pub fs: &'a dyn FileSystem,
}

impl<'a> System<'a> {
    pub fn new(shell: &'a dyn Shell, fs: &'a dyn FileSystem) -> Self {
        Self { shell, fs }
    }

    pub fn run(&self, command: &ShellCommand) -> Result<CommandOutput> {
        log::debug!("Running: {command}");
        self.shell.run(command)
    }

    pub fn run_checked(&self, command: &ShellCommand) -> Result<CommandOutput> {
        log::debug!("Running: {command}");
        self.shell.run_checked(command)
    }

    pub fn run_capture(&self, command: &ShellCommand) -> Result<String> {
        log::debug!("Running: {command}");
        self.shell.run_capture(command)
    }
}

/// Callbacks fired while a run converges.
///
/// Implement this trait to render progress or collect a report.
pub trait ConvergeEvents {
    /// Called once before the first resource.
    fn run_started(&mut self, resource_count: usize, why_run: bool);

    /// Called when a provider is about to run an action.
    fn resource_action_start(&mut self, resource: &Resource, action: &str, provider: &str);

    /// Called after the provider observed the live system.
    fn current_state_loaded(&mut self, _resource: &Resource, _current: Option<&Snapshot>) {}

    /// Called for every why-run assumption.
    fn whyrun_assumption(&mut self, resource: &Resource, action: &str, message: &str);

    /// Called for every converge description recorded by the action.
    fn update_applied(&mut self, resource: &Resource, action: &str, description: &str);

    fn resource_up_to_date(&mut self, _resource: &Resource, _action: &str) {}

    fn resource_updated(&mut self, _resource: &Resource, _action: &str) {}

    fn resource_bypassed(&mut self, _resource: &Resource, _action: &str) {}

    fn resource_failed(&mut self, _resource: &Resource, _action: &str, _failure: &ResourceFailure) {
    }

    /// Called when a resource action finishes, whatever its status.
    fn resource_completed(&mut self, resource: &Resource, outcome: &ResourceOutcome);

    /// Called once after the last resource.
    fn run_completed(&mut self, summary: &RunSummary);
}

/// No-op event handler
pub struct NoEvents;

impl ConvergeEvents for NoEvents {
    fn run_started(&mut self, _resource_count: usize, _why_run: bool) {}
    fn resource_action_start(&mut self, _resource: &Resource, _action: &str, _provider: &str) {}
    fn whyrun_assumption(&mut self, _resource: &Resource, _action: &str, _message: &str) {}
    fn update_applied(&mut self, _resource: &Resource, _action: &str, _description: &str) {}
    fn resource_completed(&mut self, _resource: &Resource, _outcome: &ResourceOutcome) {}
    fn run_completed(&mut self, _summary: &RunSummary) {}
}
