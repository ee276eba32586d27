//! `steward apply`: converge a run list.

use super::{Machine, registry};
use crate::Context;
use crate::cli::ApplyArgs;
use crate::formatter::DocFormatter;
use crate::report::RunReport;
use crate::runlist::{self, Catalog};
use crate::{config, ui};
use anyhow::{Result, bail};
use chrono::Utc;
use convergence::{ConvergeEvents, Environment, RunList, RunSummary, System, converge};

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let mut config = config::load(ctx.config.as_deref())?;
    if args.why_run {
        config.why_run = true;
    }
    let machine = Machine::with_config(config)?;

    let catalog = Catalog::builtin()?;
    let mut run_list = runlist::load(&args.runlist, &catalog, machine.config.deprecation_policy())?
        .filter_by_target(args.target.as_deref());
    if run_list.is_empty() {
        ui::warn("Nothing to converge");
        return Ok(());
    }

    let started_at = Utc::now();
    let mut formatter = DocFormatter::stdout(ctx.quiet);
    let summary = execute(&machine, &mut run_list, &mut formatter)?;
    let finished_at = Utc::now();

    if let Some(path) = &args.report {
        RunReport::new(
            started_at,
            finished_at,
            machine.config.why_run,
            &machine.node,
            &summary,
        )
        .write(path)?;
        if !ctx.quiet {
            ui::info(&format!("Report written to {}", path.display()));
        }
    }

    if !summary.is_success() {
        bail!("{} of {} actions failed", summary.failed, summary.total());
    }
    Ok(())
}

/// Converge `run_list` against the machine's collaborators.
pub fn execute(
    machine: &Machine,
    run_list: &mut RunList,
    events: &mut dyn ConvergeEvents,
) -> Result<RunSummary> {
    let registry = registry()?;
    let env = Environment {
        system: System::new(&machine.shell, &machine.fs),
        node: &machine.node,
        config: &machine.config,
    };
    Ok(converge(run_list, &registry, &env, events))
}
