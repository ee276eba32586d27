//! # filesystems
//!
//! `mount` and `file` resource types and their providers.
//!
//! | Resource | Provider | Registered for |
//! |----------|----------|----------------|
//! | `mount`  | `mount::mount` (fstab + `mount` output) | every node |
//! | `mount`  | `mount::linux` (fstab + `findmnt`) | os `linux` |
//! | `mount`  | `mount::solaris` (vfstab + `mount -v`) | os `solaris2` |
//! | `file`   | `file::default` | every node |

pub mod file;
pub mod mount;

use convergence::{ProviderRegistry, ResourceType, Result};
use std::sync::Arc;

/// Register every provider of this crate.
pub fn register(registry: &mut ProviderRegistry) -> Result<()> {
    mount::register(registry)?;
    file::register(registry)?;
    Ok(())
}

/// Resource types defined by this crate.
pub fn resource_types() -> Result<Vec<Arc<ResourceType>>> {
    Ok(vec![mount::resource_type()?, file::resource_type()?])
}
