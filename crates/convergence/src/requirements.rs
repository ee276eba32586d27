//! Requirement ledger: ordered preconditions checked before an action runs.
//!
//! Providers register [`Assertion`]s during `define_resource_requirements`.
//! The ledger then evaluates the ones in scope for the dispatched action:
//!
//! - normal mode: the first failure raises its error
//! - why-run mode: failures become logged assumptions, and a failing
//!   `block_action` assertion bypasses the action method

use crate::error::{Error, ErrorKind, Result};

/// Which actions an assertion applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every action.
    All,
    /// Only the listed actions.
    Actions(Vec<String>),
}

impl Scope {
    pub fn actions<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Actions(actions.into_iter().map(Into::into).collect())
    }

    pub fn covers(&self, action: &str) -> bool {
        match self {
            Self::All => true,
            Self::Actions(actions) => actions.iter().any(|a| a == action),
        }
    }
}

/// A single precondition.
pub struct Assertion<'a> {
    scope: Scope,
    check: Option<Box<dyn Fn() -> bool + 'a>>,
    failure: Option<(ErrorKind, String)>,
    whyrun: Option<String>,
    block_action: bool,
}

impl<'a> Assertion<'a> {
    fn new(scope: Scope) -> Self {
        Self {
            scope,
            check: None,
            failure: None,
            whyrun: None,
            block_action: false,
        }
    }

    /// The predicate. Must only observe.
    pub fn assertion(&mut self, check: impl Fn() -> bool + 'a) -> &mut Self {
        self.check = Some(Box::new(check));
        self
    }

    pub fn failure_message(&mut self, kind: ErrorKind, message: impl Into<String>) -> &mut Self {
        self.failure = Some((kind, message.into()));
        self
    }

    pub fn whyrun(&mut self, message: impl Into<String>) -> &mut Self {
        self.whyrun = Some(message.into());
        self
    }

    /// Skip the action method in why-run mode when this assertion fails.
    pub fn block_action(&mut self) -> &mut Self {
        self.block_action = true;
        self
    }

    fn passes(&self) -> bool {
        self.check.as_ref().is_none_or(|check| check())
    }

    fn failure_text(&self) -> String {
        self.failure
            .as_ref()
            .map_or_else(|| "assertion failed".to_string(), |(_, m)| m.clone())
    }
}

/// Result of running the ledger for one action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerOutcome {
    /// Why-run assumptions, in evaluation order.
    pub assumptions: Vec<String>,
    /// A failing blocking assertion bypassed the action.
    pub blocked: bool,
}

/// Ordered list of assertions.
#[derive(Default)]
pub struct Requirements<'a> {
    assertions: Vec<Assertion<'a>>,
}

impl<'a> Requirements<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an assertion and return it for configuration.
    pub fn assert(&mut self, scope: Scope) -> &mut Assertion<'a> {
        self.assertions.push(Assertion::new(scope));
        let last = self.assertions.len() - 1;
        &mut self.assertions[last]
    }

    pub fn len(&self) -> usize {
        self.assertions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assertions.is_empty()
    }

    /// Evaluate the assertions in scope for `action`, in registration order.
    pub fn run(&self, action: &str, why_run: bool) -> Result<LedgerOutcome> {
        let mut outcome = LedgerOutcome::default();
        for assertion in self.assertions.iter().filter(|a| a.scope.covers(action)) {
            if assertion.passes() {
                continue;
            }
            if !why_run {
                let (kind, message) = assertion
                    .failure
                    .clone()
                    .unwrap_or((ErrorKind::PreconditionFailed, assertion.failure_text()));
                return Err(Error::from_kind(kind, message));
            }

            let assumption = assertion
                .whyrun
                .clone()
                .unwrap_or_else(|| assertion.failure_text());
            log::info!("Assuming: {assumption}");
            outcome.assumptions.push(assumption);

            if assertion.block_action {
                log::debug!("Action {action} bypassed by a failing blocking assertion");
                outcome.blocked = true;
                break;
            }
        }
        Ok(outcome)
    }
}
