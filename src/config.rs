//! Loading the engine [`Config`] from TOML.

use crate::paths;
use anyhow::{Context, Result};
use convergence::{Config, SystemPaths};
use std::fs;
use std::path::{Path, PathBuf};

/// Load config from `explicit`, else the default file if it exists, else
/// defaults.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        let path = paths::expand(&path.to_string_lossy());
        return load_file(&path);
    }
    let path = paths::default_config_file()?;
    if path.exists() {
        load_file(&path)
    } else {
        log::debug!("No config at {}, using defaults", path.display());
        Ok(Config::default())
    }
}

/// Parse one config file.
pub fn load_file(path: &Path) -> Result<Config> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;
    let mut config: Config =
        toml::from_str(&content).with_context(|| format!("Invalid config in {}", path.display()))?;
    expand_paths(&mut config.paths);
    log::debug!("Loaded config from {}", path.display());
    Ok(config)
}

fn expand_paths(paths: &mut SystemPaths) {
    for path in [
        &mut paths.fstab,
        &mut paths.vfstab,
        &mut paths.group,
        &mut paths.passwd,
        &mut paths.shadow,
        &mut paths.master_passwd,
    ] {
        *path = expand_one(path);
    }
}

fn expand_one(path: &Path) -> PathBuf {
    paths::expand(&path.to_string_lossy())
}
