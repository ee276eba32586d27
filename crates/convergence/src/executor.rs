//! Run executor - converges a run list sequentially in declaration order
//!
//! Each planned action resolves its provider through the registry (once per
//! resource type per run), builds a fresh provider instance and drives it
//! through [`run_action`]. A failing resource is recorded and the run moves
//! on to the next one.

use crate::config::Config;
use crate::context::{ConvergeEvents, System};
use crate::error::{Error, ErrorKind, Result};
use crate::node::NodeFacts;
use crate::planner::RunList;
use crate::provider::{ActionOutcome, ProviderContext, run_action};
use crate::registry::{ProviderRegistry, Registration};
use crate::resource::Resource;
use crate::types::{ActionStatus, ResourceFailure, ResourceOutcome, RunSummary};
use std::collections::HashMap;

/// What the executor hands to every provider.
#[derive(Clone, Copy)]
pub struct Environment<'a> {
    pub system: System<'a>,
    pub node: &'a NodeFacts,
    pub config: &'a Config,
}

/// Per-run cache of registry resolutions.
struct Resolutions<'r> {
    registry: &'r ProviderRegistry,
    cache: HashMap<String, std::result::Result<&'r Registration, (ErrorKind, String)>>,
}

impl<'r> Resolutions<'r> {
    fn new(registry: &'r ProviderRegistry) -> Self {
        Self {
            registry,
            cache: HashMap::new(),
        }
    }

    fn resolve(&mut self, resource_type: &str, node: &NodeFacts) -> Result<&'r Registration> {
        let registry = self.registry;
        let cached = self
            .cache
            .entry(resource_type.to_string())
            .or_insert_with(|| {
                registry
                    .resolve(resource_type, node)
                    .map_err(|e| (e.kind(), e.to_string()))
            });
        match cached {
            Ok(registration) => Ok(*registration),
            Err((kind, message)) => Err(Error::from_kind(*kind, message.clone())),
        }
    }
}

/// Converge every entry of `run_list`.
pub fn converge(
    run_list: &mut RunList,
    registry: &ProviderRegistry,
    env: &Environment<'_>,
    events: &mut dyn ConvergeEvents,
) -> RunSummary {
    let why_run = env.config.why_run;
    events.run_started(run_list.total_actions(), why_run);

    let mut resolutions = Resolutions::new(registry);
    let mut summary = RunSummary::default();

    for entry in &mut run_list.entries {
        for action in &entry.actions {
            let outcome =
                converge_action(&mut entry.resource, action, &mut resolutions, env, events);
            summary.add_outcome(outcome);
        }
    }

    log::info!(
        "Converged {} actions: {} updated, {} failed",
        summary.total(),
        summary.updated,
        summary.failed
    );
    events.run_completed(&summary);
    summary
}

fn converge_action(
    resource: &mut Resource,
    action: &str,
    resolutions: &mut Resolutions<'_>,
    env: &Environment<'_>,
    events: &mut dyn ConvergeEvents,
) -> ResourceOutcome {
    let mut provider_name = None;
    let result = resolutions
        .resolve(resource.type_name(), env.node)
        .and_then(|registration| {
            let mut provider = registration.build(env.config);
            provider_name = Some(provider.name().to_string());
            events.resource_action_start(resource, action, provider.name());
            let ctx = ProviderContext {
                new_resource: resource,
                system: env.system,
                node: env.node,
                config: env.config,
                why_run: env.config.why_run,
            };
            run_action(provider.as_mut(), action, &ctx, events)
        });

    let outcome = match result {
        Ok(done) => {
            resource.set_updated(done.updated);
            succeeded(resource, action, provider_name, done)
        }
        Err(err) => {
            resource.set_updated(false);
            log::error!("{resource} ({action}) failed: {err}");
            failed(resource, action, provider_name, &err)
        }
    };

    match (&outcome.status, &outcome.error) {
        (ActionStatus::Updated, _) => events.resource_updated(resource, action),
        (ActionStatus::UpToDate, _) => events.resource_up_to_date(resource, action),
        (ActionStatus::Bypassed, _) => events.resource_bypassed(resource, action),
        (ActionStatus::Failed, Some(failure)) => events.resource_failed(resource, action, failure),
        _ => {}
    }
    events.resource_completed(resource, &outcome);
    outcome
}

fn succeeded(
    resource: &Resource,
    action: &str,
    provider: Option<String>,
    done: ActionOutcome,
) -> ResourceOutcome {
    let status = if done.bypassed {
        ActionStatus::Bypassed
    } else if done.updated {
        ActionStatus::Updated
    } else if action == crate::resource::ACTION_NOTHING {
        ActionStatus::Skipped
    } else {
        ActionStatus::UpToDate
    };
    ResourceOutcome {
        resource: resource.to_string(),
        action: action.to_string(),
        provider,
        status,
        descriptions: done.descriptions,
        assumptions: done.assumptions,
        error: None,
    }
}

fn failed(
    resource: &Resource,
    action: &str,
    provider: Option<String>,
    err: &Error,
) -> ResourceOutcome {
    ResourceOutcome {
        resource: resource.to_string(),
        action: action.to_string(),
        provider,
        status: ActionStatus::Failed,
        descriptions: Vec::new(),
        assumptions: Vec::new(),
        error: Some(ResourceFailure {
            kind: err.kind(),
            message: err.to_string(),
        }),
    }
}
