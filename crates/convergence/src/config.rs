//! Engine configuration, threaded explicitly through the registry and
//! every provider.

use crate::resource::DeprecationPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for one convergence run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Simulate every action without mutating the system.
    pub why_run: bool,
    /// Raise instead of warn when `set(nil)` is resolved as a read.
    pub treat_deprecation_warnings_as_errors: bool,
    /// Kill shell commands running longer than this.
    pub command_timeout_secs: Option<u64>,
    pub paths: SystemPaths,
    pub node: NodeOverrides,
}

impl Config {
    pub fn deprecation_policy(&self) -> DeprecationPolicy {
        if self.treat_deprecation_warnings_as_errors {
            DeprecationPolicy::Error
        } else {
            DeprecationPolicy::Warn
        }
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}

/// Locations of the system databases providers read and rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemPaths {
    pub fstab: PathBuf,
    pub vfstab: PathBuf,
    pub group: PathBuf,
    pub passwd: PathBuf,
    pub shadow: PathBuf,
    pub master_passwd: PathBuf,
}

impl Default for SystemPaths {
    fn default() -> Self {
        Self {
            fstab: PathBuf::from("/etc/fstab"),
            vfstab: PathBuf::from("/etc/vfstab"),
            group: PathBuf::from("/etc/group"),
            passwd: PathBuf::from("/etc/passwd"),
            shadow: PathBuf::from("/etc/shadow"),
            master_passwd: PathBuf::from("/etc/master.passwd"),
        }
    }
}

/// Node fact overrides; unset fields keep the detected value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeOverrides {
    pub platform: Option<String>,
    pub platform_family: Option<String>,
    pub os: Option<String>,
    pub platform_version: Option<String>,
}
