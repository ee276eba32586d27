//! Provider trait and the per-action lifecycle state machine.
//!
//! [`run_action`] drives one provider through
//! `Created → CurrentStateLoaded → RequirementsDefined → RequirementsChecked
//! → ActionDispatched → Converged | Failed`.
//!
//! Every mutation a provider performs goes through
//! [`ConvergeActions::converge_by`], which skips the closure in why-run mode
//! but still records its description. A resource is updated exactly when
//! at least one description was recorded.

use crate::config::Config;
use crate::context::{ConvergeEvents, System};
use crate::diff::changed_properties;
use crate::error::{Error, Result};
use crate::node::NodeFacts;
use crate::requirements::Requirements;
use crate::resource::{ACTION_NOTHING, Resource, Snapshot};
use std::fmt;

/// Everything a provider may read while handling one action.
#[derive(Clone, Copy)]
pub struct ProviderContext<'a> {
    /// The declared resource. Read-only during convergence.
    pub new_resource: &'a Resource,
    pub system: System<'a>,
    pub node: &'a NodeFacts,
    pub config: &'a Config,
    pub why_run: bool,
}

/// Platform-specific strategy that converges one resource.
pub trait Provider {
    /// Registry name, e.g. `group::gpasswd`.
    fn name(&self) -> &'static str;

    /// Observe the live system. Must never mutate it.
    fn load_current_resource(&mut self, ctx: &ProviderContext<'_>) -> Result<()>;

    /// The snapshot loaded by [`Provider::load_current_resource`]; `None`
    /// when the thing does not exist.
    fn current_resource(&self) -> Option<&Snapshot>;

    /// Register preconditions.
    fn define_resource_requirements<'a>(
        &'a self,
        _ctx: &ProviderContext<'a>,
        _requirements: &mut Requirements<'a>,
    ) {
    }

    /// Run the named action method.
    fn action(
        &mut self,
        action: &str,
        ctx: &ProviderContext<'_>,
        converge: &mut ConvergeActions,
    ) -> Result<()>;
}

/// Error for an action a provider does not implement.
pub fn unsupported_action(provider: &str, resource: &Resource, action: &str) -> Error {
    Error::UnsupportedOperation(format!(
        "{provider} does not implement action {action} for {resource}"
    ))
}

// ============================================================================
// Converge actions
// ============================================================================

/// One or more converge descriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptions(pub Vec<String>);

impl From<String> for Descriptions {
    fn from(s: String) -> Self {
        Self(vec![s])
    }
}

impl From<&str> for Descriptions {
    fn from(s: &str) -> Self {
        Self(vec![s.to_string()])
    }
}

impl From<Vec<String>> for Descriptions {
    fn from(v: Vec<String>) -> Self {
        Self(v)
    }
}

/// Recorder of the mutations an action performed (or would perform).
#[derive(Debug)]
pub struct ConvergeActions {
    why_run: bool,
    actions: Vec<Descriptions>,
}

impl ConvergeActions {
    pub fn new(why_run: bool) -> Self {
        Self {
            why_run,
            actions: Vec::new(),
        }
    }

    pub fn why_run(&self) -> bool {
        self.why_run
    }

    /// Record `descriptions` and run `f` unless in why-run mode.
    pub fn converge_by<F>(&mut self, descriptions: impl Into<Descriptions>, f: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let descriptions = descriptions.into();
        if self.why_run {
            for d in &descriptions.0 {
                log::info!("Would {d}");
            }
        } else {
            f()?;
            for d in &descriptions.0 {
                log::info!("- {d}");
            }
        }
        self.actions.push(descriptions);
        Ok(())
    }

    /// Converge only when a desired-state property differs from `current`.
    ///
    /// Returns whether anything was converged.
    pub fn converge_if_changed<F>(
        &mut self,
        new: &Resource,
        current: Option<&Snapshot>,
        f: F,
    ) -> Result<bool>
    where
        F: FnOnce() -> Result<()>,
    {
        let changes = changed_properties(new, current)?;
        if changes.is_empty() {
            log::debug!("{new}: skipped, no properties changed");
            return Ok(false);
        }
        let mut descriptions = Vec::with_capacity(changes.len() + 1);
        descriptions.push(if current.is_some() {
            format!("update {new}")
        } else {
            format!("create {new}")
        });
        descriptions.extend(changes.iter().map(|c| format!("  {}", c.describe())));
        self.converge_by(descriptions, f)?;
        Ok(true)
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// All recorded descriptions, flattened.
    pub fn descriptions(&self) -> Vec<String> {
        self.actions.iter().flat_map(|d| d.0.iter().cloned()).collect()
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

/// States of [`run_action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    CurrentStateLoaded,
    RequirementsDefined,
    RequirementsChecked,
    ActionDispatched,
    Converged,
    Failed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::CurrentStateLoaded => "current_state_loaded",
            Self::RequirementsDefined => "requirements_defined",
            Self::RequirementsChecked => "requirements_checked",
            Self::ActionDispatched => "action_dispatched",
            Self::Converged => "converged",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What one action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub state: LifecycleState,
    pub updated: bool,
    pub bypassed: bool,
    pub descriptions: Vec<String>,
    pub assumptions: Vec<String>,
}

impl ActionOutcome {
    fn skipped() -> Self {
        Self {
            state: LifecycleState::Converged,
            updated: false,
            bypassed: false,
            descriptions: Vec::new(),
            assumptions: Vec::new(),
        }
    }
}

struct Lifecycle<'r> {
    resource: &'r Resource,
    action: &'r str,
    state: LifecycleState,
}

impl Lifecycle<'_> {
    fn advance(&mut self, next: LifecycleState) {
        log::debug!(
            "{} {}: {} -> {}",
            self.resource,
            self.action,
            self.state,
            next
        );
        self.state = next;
    }
}

/// Check that every required property of `resource` has a value.
pub fn validate_required_properties(resource: &Resource) -> Result<()> {
    for p in resource.resource_type().properties() {
        if p.is_required() && resource.get_opt(p.name())?.is_none() {
            return Err(Error::Required {
                property: p.name().to_string(),
            });
        }
    }
    Ok(())
}

/// Drive `provider` through the full lifecycle for `action`.
pub fn run_action(
    provider: &mut dyn Provider,
    action: &str,
    ctx: &ProviderContext<'_>,
    events: &mut dyn ConvergeEvents,
) -> Result<ActionOutcome> {
    let resource = ctx.new_resource;
    let mut lifecycle = Lifecycle {
        resource,
        action,
        state: LifecycleState::Created,
    };

    if !resource.resource_type().supports_action(action) {
        return Err(unsupported_action(provider.name(), resource, action));
    }
    if action == ACTION_NOTHING {
        log::debug!("{resource}: action nothing");
        return Ok(ActionOutcome::skipped());
    }

    match drive(provider, action, ctx, events, &mut lifecycle) {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            lifecycle.advance(LifecycleState::Failed);
            Err(err)
        }
    }
}

fn drive(
    provider: &mut dyn Provider,
    action: &str,
    ctx: &ProviderContext<'_>,
    events: &mut dyn ConvergeEvents,
    lifecycle: &mut Lifecycle<'_>,
) -> Result<ActionOutcome> {
    let resource = ctx.new_resource;

    validate_required_properties(resource)?;
    provider.load_current_resource(ctx)?;
    lifecycle.advance(LifecycleState::CurrentStateLoaded);
    events.current_state_loaded(resource, provider.current_resource());

    let ledger = {
        let mut requirements = Requirements::new();
        provider.define_resource_requirements(ctx, &mut requirements);
        lifecycle.advance(LifecycleState::RequirementsDefined);
        requirements.run(action, ctx.why_run)?
    };
    lifecycle.advance(LifecycleState::RequirementsChecked);
    for assumption in &ledger.assumptions {
        events.whyrun_assumption(resource, action, assumption);
    }

    if ledger.blocked {
        lifecycle.advance(LifecycleState::Converged);
        return Ok(ActionOutcome {
            state: LifecycleState::Converged,
            updated: false,
            bypassed: true,
            descriptions: Vec::new(),
            assumptions: ledger.assumptions,
        });
    }

    let mut converge = ConvergeActions::new(ctx.why_run);
    provider.action(action, ctx, &mut converge)?;
    lifecycle.advance(LifecycleState::ActionDispatched);

    let descriptions = converge.descriptions();
    for d in &descriptions {
        events.update_applied(resource, action, d);
    }
    lifecycle.advance(LifecycleState::Converged);

    Ok(ActionOutcome {
        state: LifecycleState::Converged,
        updated: !converge.is_empty(),
        bypassed: false,
        descriptions,
        assumptions: ledger.assumptions,
    })
}
