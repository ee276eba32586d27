pub mod apply;
pub mod inspect;

use crate::Context;
use crate::fs::RealFileSystem;
use crate::shell::RealShell;
use crate::{config, facts};
use anyhow::{Context as _, Result};
use convergence::{Config, NodeFacts, ProviderRegistry};

/// Registry with every provider shipped with steward.
pub fn registry() -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();
    accounts::register(&mut registry).context("Could not register account providers")?;
    filesystems::register(&mut registry).context("Could not register filesystem providers")?;
    Ok(registry)
}

/// Config, real collaborators and detected facts for this machine.
pub struct Machine {
    pub config: Config,
    pub shell: RealShell,
    pub fs: RealFileSystem,
    pub node: NodeFacts,
}

impl Machine {
    pub fn load(ctx: &Context) -> Result<Self> {
        Self::with_config(config::load(ctx.config.as_deref())?)
    }

    pub fn with_config(config: Config) -> Result<Self> {
        let shell = RealShell::new(config.command_timeout());
        let fs = RealFileSystem;
        let node = facts::detect(&shell, &fs, &config);
        log::info!("Node: {node}");
        Ok(Self {
            config,
            shell,
            fs,
            node,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_catalog() {
        let registry = registry().unwrap();
        let types: Vec<&str> = registry.resource_types().collect();
        for name in ["file", "group", "mount", "user"] {
            assert!(types.contains(&name), "{name} has no providers");
        }
    }
}
