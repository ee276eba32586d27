//! Core types shared by collaborators, the lifecycle and the executor.

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::Output;

// ============================================================================
// Shell commands
// ============================================================================

/// A command for the shell collaborator: program, argv and accepted
/// exit statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Exit statuses treated as success by `run_checked`.
    pub returns: Vec<i32>,
    /// Data written to the child's stdin.
    pub stdin: Option<String>,
}

impl ShellCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            returns: vec![0],
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn returns<I: IntoIterator<Item = i32>>(mut self, codes: I) -> Self {
        self.returns = codes.into_iter().collect();
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn accepts(&self, status: i32) -> bool {
        self.returns.contains(&status)
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() {
                f.write_str(" \"\"")?;
            } else if arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Output from a shell command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit status; -1 when terminated by a signal.
    pub status: i32,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            status: 0,
        }
    }

    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            status,
        }
    }

    pub fn success(&self) -> bool {
        self.status == 0
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code().unwrap_or(-1),
        }
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Final status of one resource action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Converge actions were recorded (executed, or simulated in why-run).
    Updated,
    /// Desired state already matched.
    UpToDate,
    /// A blocking assertion failed in why-run mode.
    Bypassed,
    /// The `nothing` action.
    Skipped,
    /// The lifecycle raised.
    Failed,
}

impl ActionStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Error details for a failed resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceFailure {
    pub kind: ErrorKind,
    pub message: String,
}

/// Result of converging one action of one resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceOutcome {
    /// `type[name]`.
    pub resource: String,
    pub action: String,
    /// Provider that handled the action, when one was resolved.
    pub provider: Option<String>,
    pub status: ActionStatus,
    pub descriptions: Vec<String>,
    pub assumptions: Vec<String>,
    pub error: Option<ResourceFailure>,
}

/// Summary of a convergence run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub updated: usize,
    pub up_to_date: usize,
    pub bypassed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub assumptions: usize,
    pub outcomes: Vec<ResourceOutcome>,
}

impl RunSummary {
    /// Check if the run was fully successful (no failures).
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of actions processed.
    pub fn total(&self) -> usize {
        self.updated + self.up_to_date + self.bypassed + self.skipped + self.failed
    }

    pub fn add_outcome(&mut self, outcome: ResourceOutcome) {
        match outcome.status {
            ActionStatus::Updated => self.updated += 1,
            ActionStatus::UpToDate => self.up_to_date += 1,
            ActionStatus::Bypassed => self.bypassed += 1,
            ActionStatus::Skipped => self.skipped += 1,
            ActionStatus::Failed => self.failed += 1,
        }
        self.assumptions += outcome.assumptions.len();
        self.outcomes.push(outcome);
    }

    pub fn failures(&self) -> impl Iterator<Item = &ResourceOutcome> {
        self.outcomes.iter().filter(|o| o.status.is_failure())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: ActionStatus, assumptions: usize) -> ResourceOutcome {
        ResourceOutcome {
            resource: "group[wheel]".to_string(),
            action: "create".to_string(),
            provider: None,
            status,
            descriptions: Vec::new(),
            assumptions: vec!["a".to_string(); assumptions],
            error: None,
        }
    }

    #[test]
    fn test_shell_command_display() {
        let cmd = ShellCommand::new("gpasswd").args(["-M", "", "wheel"]);
        assert_eq!(cmd.to_string(), "gpasswd -M \"\" wheel");
        let cmd = ShellCommand::new("usermod").args(["-c", "Adam Jacob", "adam"]);
        assert_eq!(cmd.to_string(), "usermod -c \"Adam Jacob\" adam");
    }

    #[test]
    fn test_shell_command_returns() {
        let cmd = ShellCommand::new("passwd").returns([0, 1]);
        assert!(cmd.accepts(1));
        assert!(!cmd.accepts(2));
        assert!(ShellCommand::new("true").accepts(0));
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = RunSummary::default();
        summary.add_outcome(outcome(ActionStatus::Updated, 0));
        summary.add_outcome(outcome(ActionStatus::UpToDate, 0));
        summary.add_outcome(outcome(ActionStatus::Bypassed, 2));
        assert!(summary.is_success());
        summary.add_outcome(outcome(ActionStatus::Failed, 0));
        assert!(!summary.is_success());
        assert_eq!(summary.total(), 4);
        assert_eq!(summary.assumptions, 2);
        assert_eq!(summary.failures().count(), 1);
    }
}
