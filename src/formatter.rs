//! Doc-style convergence output.
//!
//! ```text
//! Converging 2 actions
//! * group[wheel] action create (group::gpasswd)
//!   - create group wheel
//! * user[adam] action lock (user::useradd)
//!   * Cannot determine if user[adam] is locked!
//!   * assumed would succeed
//!   - would lock the user adam
//! ```

use colored::Colorize;
use convergence::{ConvergeEvents, Resource, ResourceFailure, ResourceOutcome, RunSummary};
use std::io::Write;

/// Renders [`ConvergeEvents`] as human-readable lines.
pub struct DocFormatter<W: Write> {
    out: W,
    why_run: bool,
    quiet: bool,
}

impl DocFormatter<std::io::Stdout> {
    pub fn stdout(quiet: bool) -> Self {
        Self::new(std::io::stdout(), quiet)
    }
}

impl<W: Write> DocFormatter<W> {
    pub fn new(out: W, quiet: bool) -> Self {
        Self {
            out,
            why_run: false,
            quiet,
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}") {
            log::debug!("Could not write output: {e}");
        }
    }

    fn detail(&mut self, text: &str) {
        if !self.quiet {
            self.line(&format!("  {text}"));
        }
    }
}

impl<W: Write> ConvergeEvents for DocFormatter<W> {
    fn run_started(&mut self, resource_count: usize, why_run: bool) {
        self.why_run = why_run;
        let mode = if why_run { " (why-run)" } else { "" };
        self.line(&format!("Converging {resource_count} actions{mode}").bold().to_string());
    }

    fn resource_action_start(&mut self, resource: &Resource, action: &str, provider: &str) {
        if self.quiet {
            return;
        }
        self.line(&format!(
            "{} {} action {} {}",
            "*".cyan(),
            resource.to_string().bold(),
            action,
            format!("({provider})").dimmed()
        ));
    }

    fn whyrun_assumption(&mut self, _resource: &Resource, _action: &str, message: &str) {
        self.detail(&format!("{} {}", "*".yellow(), message));
        self.detail(&format!("{} {}", "*".yellow(), "assumed would succeed".dimmed()));
    }

    fn update_applied(&mut self, _resource: &Resource, _action: &str, description: &str) {
        let text = if self.why_run {
            format!("would {description}")
        } else {
            description.to_string()
        };
        self.detail(&format!("{} {}", "-".green(), text));
    }

    fn resource_up_to_date(&mut self, _resource: &Resource, _action: &str) {
        self.detail(&"(up to date)".dimmed().to_string());
    }

    fn resource_bypassed(&mut self, _resource: &Resource, _action: &str) {
        self.detail(&"(bypassed: assertion failed)".yellow().to_string());
    }

    fn resource_failed(&mut self, resource: &Resource, action: &str, failure: &ResourceFailure) {
        self.line(&format!(
            "  {} {resource} ({action}): {}",
            "✗".red(),
            failure.message
        ));
        self.line(&format!("    {}", failure.kind.advice().dimmed()));
    }

    fn resource_completed(&mut self, _resource: &Resource, _outcome: &ResourceOutcome) {}

    fn run_completed(&mut self, summary: &RunSummary) {
        let verb = if self.why_run { "would be updated" } else { "updated" };
        let mut text = format!(
            "{}/{} actions {verb}",
            summary.updated,
            summary.total()
        );
        if summary.assumptions > 0 {
            text.push_str(&format!(", {} assumptions", summary.assumptions));
        }
        if summary.failed > 0 {
            text.push_str(&format!(", {} failed", summary.failed));
            self.line(&format!("{} {text}", "✗".red()));
        } else {
            self.line(&format!("{} {text}", "✓".green()));
        }
    }
}
