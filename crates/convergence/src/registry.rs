//! Provider registry: picks the provider for a resource type on a node.
//!
//! Registrations pair a resource type with a [`PlatformPredicate`] and a
//! factory. Resolution keeps the registrations whose predicate matches the
//! node facts and picks the most specific:
//!
//! | Predicate | Matches on | Specificity |
//! |-----------|------------|-------------|
//! | `Exact`   | platform name | highest |
//! | `Family`  | platform family | |
//! | `Os`      | OS name | |
//! | `Default` | always | lowest |
//!
//! Two survivors at the same specificity are a configuration error unless
//! exactly one of them was registered as an override.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::node::NodeFacts;
use crate::provider::Provider;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Builds a provider instance for one resource action.
pub type ProviderFactory = Arc<dyn Fn(&Config) -> Box<dyn Provider> + Send + Sync>;

/// How specific a predicate is; higher wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Specificity {
    Default,
    Os,
    Family,
    Exact,
}

impl fmt::Display for Specificity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Default => "default",
            Self::Os => "os",
            Self::Family => "platform family",
            Self::Exact => "platform",
        };
        f.write_str(name)
    }
}

/// Node condition under which a provider applies.
///
/// List entries prefixed with `!` exclude that name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformPredicate {
    Exact(Vec<String>),
    Family(Vec<String>),
    Os(Vec<String>),
    Default,
}

fn names<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

fn list_matches(list: &[String], value: &str) -> bool {
    let (excluded, included): (Vec<&String>, Vec<&String>) =
        list.iter().partition(|n| n.starts_with('!'));
    if excluded.iter().any(|n| &n[1..] == value) {
        return false;
    }
    included.is_empty() || included.iter().any(|n| *n == value)
}

impl PlatformPredicate {
    pub fn platform(name: impl Into<String>) -> Self {
        Self::Exact(vec![name.into()])
    }

    pub fn platforms<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Exact(names(items))
    }

    pub fn family(name: impl Into<String>) -> Self {
        Self::Family(vec![name.into()])
    }

    pub fn families<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Family(names(items))
    }

    pub fn os(name: impl Into<String>) -> Self {
        Self::Os(vec![name.into()])
    }

    pub fn specificity(&self) -> Specificity {
        match self {
            Self::Exact(_) => Specificity::Exact,
            Self::Family(_) => Specificity::Family,
            Self::Os(_) => Specificity::Os,
            Self::Default => Specificity::Default,
        }
    }

    pub fn matches(&self, node: &NodeFacts) -> bool {
        match self {
            Self::Exact(list) => list_matches(list, &node.platform),
            Self::Family(list) => list_matches(list, &node.platform_family),
            Self::Os(list) => list_matches(list, &node.os),
            Self::Default => true,
        }
    }
}

impl fmt::Display for PlatformPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(list) => write!(f, "platform: {}", list.join(", ")),
            Self::Family(list) => write!(f, "platform_family: {}", list.join(", ")),
            Self::Os(list) => write!(f, "os: {}", list.join(", ")),
            Self::Default => f.write_str("default"),
        }
    }
}

/// One `(resource type, predicate, provider)` entry.
#[derive(Clone)]
pub struct Registration {
    pub resource_type: String,
    pub predicate: PlatformPredicate,
    pub provider: &'static str,
    pub overrides: bool,
    factory: ProviderFactory,
}

impl Registration {
    /// Build a fresh provider.
    pub fn build(&self, config: &Config) -> Box<dyn Provider> {
        (self.factory)(config)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("resource_type", &self.resource_type)
            .field("predicate", &self.predicate)
            .field("provider", &self.provider)
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}

/// A registration evaluated against a node, for diagnostics.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub registration: &'a Registration,
    pub matches: bool,
}

/// Registry populated at startup.
#[derive(Default)]
pub struct ProviderRegistry {
    entries: BTreeMap<String, Vec<Registration>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider. An identical predicate already registered for
    /// the type is a configuration error.
    pub fn provides(
        &mut self,
        resource_type: &str,
        predicate: PlatformPredicate,
        provider: &'static str,
        factory: impl Fn(&Config) -> Box<dyn Provider> + Send + Sync + 'static,
    ) -> Result<()> {
        self.insert(resource_type, predicate, provider, Arc::new(factory), false)
    }

    /// Register a provider that wins ties at its specificity.
    pub fn provides_override(
        &mut self,
        resource_type: &str,
        predicate: PlatformPredicate,
        provider: &'static str,
        factory: impl Fn(&Config) -> Box<dyn Provider> + Send + Sync + 'static,
    ) -> Result<()> {
        self.insert(resource_type, predicate, provider, Arc::new(factory), true)
    }

    fn insert(
        &mut self,
        resource_type: &str,
        predicate: PlatformPredicate,
        provider: &'static str,
        factory: ProviderFactory,
        overrides: bool,
    ) -> Result<()> {
        let entries = self.entries.entry(resource_type.to_string()).or_default();
        if let Some(existing) = entries
            .iter()
            .find(|r| r.predicate == predicate && r.overrides == overrides)
        {
            return Err(Error::Configuration(format!(
                "{provider} and {} are both registered for {resource_type} with {predicate}",
                existing.provider
            )));
        }
        log::trace!("Registered {provider} for {resource_type} ({predicate})");
        entries.push(Registration {
            resource_type: resource_type.to_string(),
            predicate,
            provider,
            overrides,
            factory,
        });
        Ok(())
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn registrations(&self, resource_type: &str) -> &[Registration] {
        self.entries.get(resource_type).map_or(&[], Vec::as_slice)
    }

    /// Every registration for the type, marked with whether it matches.
    pub fn candidates(&self, resource_type: &str, node: &NodeFacts) -> Vec<Candidate<'_>> {
        self.registrations(resource_type)
            .iter()
            .map(|registration| Candidate {
                registration,
                matches: registration.predicate.matches(node),
            })
            .collect()
    }

    /// Select the most specific matching registration.
    pub fn resolve(&self, resource_type: &str, node: &NodeFacts) -> Result<&Registration> {
        let matching: Vec<&Registration> = self
            .registrations(resource_type)
            .iter()
            .filter(|r| r.predicate.matches(node))
            .collect();

        let Some(best) = matching.iter().map(|r| r.predicate.specificity()).max() else {
            return Err(Error::Configuration(format!(
                "no provider for {resource_type} on {node}"
            )));
        };

        let top: Vec<&Registration> = matching
            .into_iter()
            .filter(|r| r.predicate.specificity() == best)
            .collect();

        let chosen = match top.as_slice() {
            [only] => *only,
            tied => {
                let overrides: Vec<&&Registration> = tied.iter().filter(|r| r.overrides).collect();
                match overrides.as_slice() {
                    [winner] => **winner,
                    _ => {
                        let names = tied
                            .iter()
                            .map(|r| r.provider)
                            .collect::<Vec<_>>()
                            .join(", ");
                        return Err(Error::Configuration(format!(
                            "ambiguous provider for {resource_type} on {node}: {names} all match at {best} specificity"
                        )));
                    }
                }
            }
        };

        log::debug!(
            "Resolved {resource_type} to {} ({})",
            chosen.provider,
            chosen.predicate
        );
        Ok(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::provider::{ConvergeActions, ProviderContext};
    use crate::resource::Snapshot;

    struct Named(&'static str);

    impl Provider for Named {
        fn name(&self) -> &'static str {
            self.0
        }
        fn load_current_resource(&mut self, _ctx: &ProviderContext<'_>) -> Result<()> {
            Ok(())
        }
        fn current_resource(&self) -> Option<&Snapshot> {
            None
        }
        fn action(
            &mut self,
            _action: &str,
            _ctx: &ProviderContext<'_>,
            _converge: &mut ConvergeActions,
        ) -> Result<()> {
            Ok(())
        }
    }

    fn register(
        registry: &mut ProviderRegistry,
        predicate: PlatformPredicate,
        name: &'static str,
    ) -> Result<()> {
        registry.provides("group", predicate, name, move |_| Box::new(Named(name)))
    }

    fn group_registry() -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        register(&mut registry, PlatformPredicate::os("darwin"), "dscl").unwrap();
        register(&mut registry, PlatformPredicate::os("linux"), "groupadd").unwrap();
        register(
            &mut registry,
            PlatformPredicate::families(["debian", "rhel"]),
            "gpasswd",
        )
        .unwrap();
        register(&mut registry, PlatformPredicate::platform("freebsd"), "pw").unwrap();
        register(&mut registry, PlatformPredicate::platform("centos"), "special").unwrap();
        registry
    }

    #[test]
    fn test_specificity_order() {
        assert!(Specificity::Exact > Specificity::Family);
        assert!(Specificity::Family > Specificity::Os);
        assert!(Specificity::Os > Specificity::Default);
    }

    #[test]
    fn test_family_beats_os() {
        let registry = group_registry();
        let node = NodeFacts::new("ubuntu", "debian", "linux", "22.04");
        assert_eq!(registry.resolve("group", &node).unwrap().provider, "gpasswd");
    }

    #[test]
    fn test_os_when_family_unlisted() {
        let registry = group_registry();
        let node = NodeFacts::new("alpine", "alpine", "linux", "3.19");
        assert_eq!(registry.resolve("group", &node).unwrap().provider, "groupadd");
    }

    #[test]
    fn test_exact_platform_survives_family_change() {
        let registry = group_registry();
        let node = NodeFacts::new("centos", "rhel", "linux", "7");
        assert_eq!(registry.resolve("group", &node).unwrap().provider, "special");
        let node = NodeFacts::new("centos", "debian", "linux", "7");
        assert_eq!(registry.resolve("group", &node).unwrap().provider, "special");
    }

    #[test]
    fn test_no_default_is_error() {
        let registry = group_registry();
        let node = NodeFacts::new("plan9", "plan9", "plan9", "4");
        let err = registry.resolve("group", &node).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_default_used_as_fallback() {
        let mut registry = ProviderRegistry::new();
        registry
            .provides("mount", PlatformPredicate::Default, "mount", |_| {
                Box::new(Named("mount"))
            })
            .unwrap();
        registry
            .provides("mount", PlatformPredicate::os("solaris2"), "solaris", |_| {
                Box::new(Named("solaris"))
            })
            .unwrap();
        let linux = NodeFacts::new("ubuntu", "debian", "linux", "22.04");
        assert_eq!(registry.resolve("mount", &linux).unwrap().provider, "mount");
        let sol = NodeFacts::for_os("solaris", "11");
        assert_eq!(registry.resolve("mount", &sol).unwrap().provider, "solaris");
    }

    #[test]
    fn test_identical_predicate_rejected_at_registration() {
        let mut registry = group_registry();
        let err = register(&mut registry, PlatformPredicate::os("linux"), "other").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_overlapping_tie_is_error() {
        let mut registry = group_registry();
        register(&mut registry, PlatformPredicate::family("debian"), "usermod").unwrap();
        let node = NodeFacts::new("ubuntu", "debian", "linux", "22.04");
        let err = registry.resolve("group", &node).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("gpasswd"));
        assert!(err.to_string().contains("usermod"));
    }

    #[test]
    fn test_override_breaks_tie() {
        let mut registry = group_registry();
        registry
            .provides_override("group", PlatformPredicate::family("debian"), "mine", |_| {
                Box::new(Named("mine"))
            })
            .unwrap();
        let node = NodeFacts::new("ubuntu", "debian", "linux", "22.04");
        let registration = registry.resolve("group", &node).unwrap();
        assert_eq!(registration.provider, "mine");
        assert_eq!(registration.build(&Config::default()).name(), "mine");
    }

    #[test]
    fn test_exclusion_entries() {
        let predicate = PlatformPredicate::platforms(["!ubuntu"]);
        assert!(!predicate.matches(&NodeFacts::new("ubuntu", "debian", "linux", "1")));
        assert!(predicate.matches(&NodeFacts::new("debian", "debian", "linux", "1")));
    }

    #[test]
    fn test_candidates() {
        let registry = group_registry();
        let node = NodeFacts::new("ubuntu", "debian", "linux", "22.04");
        let candidates = registry.candidates("group", &node);
        assert_eq!(candidates.len(), 5);
        assert_eq!(candidates.iter().filter(|c| c.matches).count(), 2);
    }
}
