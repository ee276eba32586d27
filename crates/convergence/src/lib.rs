//! # Convergence
//!
//! A resource convergence engine: declare desired state, observe current
//! state, and converge the system toward the declaration in idempotent,
//! simulatable steps.
//!
//! ## Core Concepts
//!
//! - **Property**: a typed, validated, optionally defaulted field of a
//!   resource type ([`Property`])
//! - **Resource**: a declared instance of a [`ResourceType`], and the
//!   [`Snapshot`] a provider loads from the live system
//! - **Requirements**: per-action assertions checked before any mutation
//!   ([`Requirements`])
//! - **Provider**: a platform strategy driven through the lifecycle by
//!   [`run_action`]
//! - **Registry**: picks the most specific provider for a node
//!   ([`ProviderRegistry`])
//! - **Executor**: converges a [`RunList`] in order ([`converge`])
//!
//! ## Example
//!
//! ```ignore
//! use convergence::{
//!     converge, Config, Environment, NodeFacts, NoEvents, PlannedAction,
//!     ProviderRegistry, Resource, RunList, System,
//! };
//!
//! let mut registry = ProviderRegistry::new();
//! accounts::register(&mut registry)?;
//!
//! let mut group = Resource::new(accounts::group::resource_type()?, "wheel");
//! group.set("members", vec!["adam", "bob"])?;
//!
//! let mut run_list: RunList = [PlannedAction::new(group)].into_iter().collect();
//! let env = Environment { system: System::new(&shell, &fs), node: &node, config: &config };
//! let summary = converge(&mut run_list, &registry, &env, &mut NoEvents);
//! ```
//!
//! ## Collaborator Traits
//!
//! Providers never touch the machine directly:
//!
//! - [`Shell`]: runs external commands
//! - [`FileSystem`]: reads and atomically rewrites files
//! - [`ConvergeEvents`]: receives progress callbacks
//!
//! The `testing` feature exposes in-memory fakes of the first two.

pub mod config;
pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod node;
pub mod planner;
pub mod property;
pub mod provider;
pub mod registry;
pub mod requirements;
pub mod resource;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;
pub mod value;

pub use config::{Config, NodeOverrides, SystemPaths};
pub use context::{ConvergeEvents, FileSystem, NoEvents, Shell, System};
pub use diff::{PropertyChange, changed_properties};
pub use error::{Error, ErrorKind, Result};
pub use executor::{Environment, converge};
pub use node::{NodeFacts, SYSTEM_GROUP_FAMILIES};
pub use planner::{PlannedAction, RunList};
pub use property::{Allowed, DefaultValue, Property};
pub use provider::{
    ActionOutcome, ConvergeActions, LifecycleState, Provider, ProviderContext, run_action,
    unsupported_action,
};
pub use registry::{PlatformPredicate, ProviderRegistry, Registration, Specificity};
pub use requirements::{Requirements, Scope};
pub use resource::{ACTION_NOTHING, DeprecationPolicy, Resource, ResourceType, Snapshot};
pub use types::{
    ActionStatus, CommandOutput, ResourceFailure, ResourceOutcome, RunSummary, ShellCommand,
};
pub use value::{Value, ValueKind};
