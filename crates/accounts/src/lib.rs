//! # accounts
//!
//! `group` and `user` resource types and their providers.
//!
//! | Resource | Provider | Registered for |
//! |----------|----------|----------------|
//! | `group`  | `group::groupadd` | os `linux` |
//! | `group`  | `group::gpasswd` | families debian, rhel, fedora, amazon, suse, arch, gentoo |
//! | `group`  | `group::usermod` | platforms openbsd, netbsd, solaris2, smartos, omnios |
//! | `group`  | `group::aix` | os `aix` |
//! | `group`  | `group::pw` | platform `freebsd` |
//! | `group`  | `group::dscl` | os `darwin` |
//! | `user`   | `user::useradd` | os `linux` |
//! | `user`   | `user::solaris` | os `solaris2` |
//! | `user`   | `user::aix` | os `aix` |
//! | `user`   | `user::pw` | platform `freebsd` |
//!
//! Neither resource has a default provider: a node no strategy claims fails
//! resolution instead of guessing a command set.

pub mod database;
pub mod group;
pub mod user;

use convergence::{ProviderRegistry, ResourceType, Result};
use std::sync::Arc;

/// Register every provider of this crate.
pub fn register(registry: &mut ProviderRegistry) -> Result<()> {
    group::register(registry)?;
    user::register(registry)?;
    Ok(())
}

/// Resource types defined by this crate.
pub fn resource_types() -> Result<Vec<Arc<ResourceType>>> {
    Ok(vec![group::resource_type()?, user::resource_type()?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use convergence::NodeFacts;

    fn provider_for(resource_type: &str, node: &NodeFacts) -> String {
        let mut registry = ProviderRegistry::new();
        register(&mut registry).unwrap();
        registry.resolve(resource_type, node).unwrap().provider.to_string()
    }

    #[test]
    fn test_group_resolution() {
        let ubuntu = NodeFacts::new("ubuntu", "debian", "linux", "22.04");
        assert_eq!(provider_for("group", &ubuntu), "group::gpasswd");

        let void = NodeFacts::new("void", "void", "linux", "");
        assert_eq!(provider_for("group", &void), "group::groupadd");

        let freebsd = NodeFacts::for_os("freebsd", "14.0");
        assert_eq!(provider_for("group", &freebsd), "group::pw");

        let solaris = NodeFacts::for_os("solaris", "5.11");
        assert_eq!(provider_for("group", &solaris), "group::usermod");

        let mac = NodeFacts::for_os("macos", "14.4");
        assert_eq!(provider_for("group", &mac), "group::dscl");

        let aix = NodeFacts::for_os("aix", "7.2");
        assert_eq!(provider_for("group", &aix), "group::aix");
    }

    #[test]
    fn test_user_resolution() {
        let fedora = NodeFacts::new("fedora", "fedora", "linux", "40");
        assert_eq!(provider_for("user", &fedora), "user::useradd");
        assert_eq!(
            provider_for("user", &NodeFacts::for_os("solaris", "5.11")),
            "user::solaris"
        );
        assert_eq!(
            provider_for("user", &NodeFacts::for_os("freebsd", "14.0")),
            "user::pw"
        );
    }

    #[test]
    fn test_no_default_provider() {
        let mut registry = ProviderRegistry::new();
        register(&mut registry).unwrap();
        let windows = NodeFacts::for_os("windows", "10");
        assert!(registry.resolve("group", &windows).is_err());
        assert!(registry.resolve("user", &windows).is_err());
    }

    #[test]
    fn test_resource_types() {
        let names: Vec<String> = resource_types()
            .unwrap()
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(names, vec!["group", "user"]);
    }
}
