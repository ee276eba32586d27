//! Property-level diffs between a resource and its current-state snapshot

use crate::error::Result;
use crate::resource::{Resource, Snapshot};
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A desired-state property whose declared value differs from the observed one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyChange {
    pub property: String,
    /// Observed value; `None` when the snapshot is absent or lacks it
    pub from: Option<Value>,
    pub to: Value,
    pub sensitive: bool,
}

impl PropertyChange {
    /// Human-readable converge description
    pub fn describe(&self) -> String {
        if self.sensitive {
            return format!("set {} to *sensitive value suppressed*", self.property);
        }
        match &self.from {
            Some(from) => format!("set {} to {} (was {})", self.property, self.to, from),
            None => format!("set {} to {}", self.property, self.to),
        }
    }
}

/// Desired-state properties explicitly set on `new` that differ from `current`
///
/// With no snapshot (the thing does not exist yet) every set property is a
/// change.
pub fn changed_properties(
    new: &Resource,
    current: Option<&Snapshot>,
) -> Result<Vec<PropertyChange>> {
    let mut changes = Vec::new();
    for p in new.resource_type().state_properties() {
        if p.is_identity() || !new.is_set(p.name()) {
            continue;
        }
        let to = new.get(p.name())?;
        let from = match current {
            Some(snapshot) => snapshot.get_opt(p.name())?,
            None => None,
        };
        if from.as_ref() == Some(&to) {
            continue;
        }
        if current.is_some() && from.is_none() && to.is_nil() {
            continue;
        }
        changes.push(PropertyChange {
            property: p.name().to_string(),
            from,
            to,
            sensitive: p.is_sensitive(),
        });
    }
    Ok(changes)
}
