//! Node facts consumed by the provider registry and by providers.
//!
//! Facts are detected once per run. [`NodeFacts::from_os_release`] maps an
//! `/etc/os-release` document onto platform and platform family names.

use crate::config::NodeOverrides;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Read-only description of the machine being converged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFacts {
    /// Distribution or OS name, e.g. `ubuntu`, `freebsd`, `mac_os_x`.
    pub platform: String,
    /// Family of related platforms, e.g. `debian`, `rhel`.
    pub platform_family: String,
    /// Kernel/OS name, e.g. `linux`, `darwin`, `solaris2`.
    pub os: String,
    pub platform_version: String,
}

/// Linux families that understand `groupadd -r`.
pub const SYSTEM_GROUP_FAMILIES: &[&str] = &[
    "debian", "rhel", "fedora", "amazon", "suse", "arch", "gentoo", "alpine",
];

impl NodeFacts {
    pub fn new(
        platform: impl Into<String>,
        platform_family: impl Into<String>,
        os: impl Into<String>,
        platform_version: impl Into<String>,
    ) -> Self {
        Self {
            platform: platform.into(),
            platform_family: platform_family.into(),
            os: os.into(),
            platform_version: platform_version.into(),
        }
    }

    pub fn is_platform(&self, names: &[&str]) -> bool {
        names.contains(&self.platform.as_str())
    }

    pub fn is_platform_family(&self, names: &[&str]) -> bool {
        names.contains(&self.platform_family.as_str())
    }

    pub fn is_os(&self, names: &[&str]) -> bool {
        names.contains(&self.os.as_str())
    }

    /// Map a Rust `std::env::consts::OS` value onto an OS fact.
    pub fn os_from_consts(os: &str) -> String {
        match os {
            "macos" => "darwin".to_string(),
            "solaris" | "illumos" => "solaris2".to_string(),
            other => other.to_string(),
        }
    }

    /// Build facts from an `/etc/os-release` document on a Linux host.
    pub fn from_os_release(content: &str) -> Self {
        let mut id = String::new();
        let mut id_like = String::new();
        let mut version = String::new();
        for line in content.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').trim_matches('\'').to_string();
            match key.trim() {
                "ID" => id = value.to_lowercase(),
                "ID_LIKE" => id_like = value.to_lowercase(),
                "VERSION_ID" => version = value,
                _ => {}
            }
        }
        let family = family_for(&id)
            .or_else(|| id_like.split_whitespace().find_map(family_for))
            .unwrap_or(id.as_str())
            .to_string();
        Self::new(id, family, "linux", version)
    }

    /// Facts for a non-Linux OS where the platform names itself.
    pub fn for_os(os: &str, version: impl Into<String>) -> Self {
        let os = Self::os_from_consts(os);
        let (platform, family) = match os.as_str() {
            "darwin" => ("mac_os_x", "mac_os_x"),
            "freebsd" => ("freebsd", "freebsd"),
            "openbsd" => ("openbsd", "openbsd"),
            "netbsd" => ("netbsd", "netbsd"),
            "solaris2" => ("solaris2", "solaris2"),
            "aix" => ("aix", "aix"),
            other => (other, other),
        };
        Self::new(platform, family, os.clone(), version)
    }

    /// Apply configured overrides.
    pub fn with_overrides(mut self, overrides: &NodeOverrides) -> Self {
        if let Some(platform) = &overrides.platform {
            self.platform = platform.clone();
        }
        if let Some(family) = &overrides.platform_family {
            self.platform_family = family.clone();
        }
        if let Some(os) = &overrides.os {
            self.os = os.clone();
        }
        if let Some(version) = &overrides.platform_version {
            self.platform_version = version.clone();
        }
        self
    }
}

impl fmt::Display for NodeFacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({} family, {} os)",
            self.platform, self.platform_version, self.platform_family, self.os
        )
    }
}

fn family_for(id: &str) -> Option<&'static str> {
    let family = match id {
        "debian" | "ubuntu" | "linuxmint" | "raspbian" | "pop" => "debian",
        "rhel" | "centos" | "rocky" | "almalinux" | "ol" | "oracle" | "scientific" => "rhel",
        "fedora" => "fedora",
        "amzn" | "amazon" => "amazon",
        "sles" | "sled" | "suse" => "suse",
        "arch" | "manjaro" | "endeavouros" => "arch",
        "alpine" => "alpine",
        "gentoo" => "gentoo",
        id if id.starts_with("opensuse") => "suse",
        _ => return None,
    };
    Some(family)
}
