//! Run list - the ordered resources and actions a run converges

use crate::resource::Resource;

/// One declared resource and the actions to run on it, in order.
#[derive(Debug, Clone)]
pub struct PlannedAction {
    pub resource: Resource,
    pub actions: Vec<String>,
}

impl PlannedAction {
    /// Plan the type's default action.
    pub fn new(resource: Resource) -> Self {
        let action = resource.resource_type().default_action().to_string();
        Self {
            resource,
            actions: vec![action],
        }
    }

    pub fn with_actions<I, S>(resource: Resource, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resource,
            actions: actions.into_iter().map(Into::into).collect(),
        }
    }
}

/// Resources in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RunList {
    pub entries: Vec<PlannedAction>,
}

impl RunList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: PlannedAction) {
        self.entries.push(entry);
    }

    /// Keep only entries matching `predicate`.
    #[must_use]
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&Resource) -> bool,
    {
        Self {
            entries: self
                .entries
                .into_iter()
                .filter(|e| predicate(&e.resource))
                .collect(),
        }
    }

    /// Keep only entries matching a target.
    ///
    /// Target format: `type`, `type.name` or `type[name]`.
    #[must_use]
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (resource_type, name) = parse_target(t);
                self.filter(|r| matches_filter(r, resource_type.as_deref(), name.as_deref()))
            }
        }
    }

    /// Number of actions the run will attempt.
    pub fn total_actions(&self) -> usize {
        self.entries.iter().map(|e| e.actions.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<PlannedAction> for RunList {
    fn from_iter<T: IntoIterator<Item = PlannedAction>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    if let Some((ty, rest)) = target.split_once('[') {
        let name = rest.strip_suffix(']').unwrap_or(rest);
        return (Some(ty.to_string()), Some(name.to_string()));
    }
    match target.split_once('.') {
        None => (Some(target.to_string()), None),
        Some((ty, name)) => (Some(ty.to_string()), Some(name.to_string())),
    }
}

fn matches_filter(resource: &Resource, resource_type: Option<&str>, name: Option<&str>) -> bool {
    if let Some(rt) = resource_type
        && resource.type_name() != rt
    {
        return false;
    }
    if let Some(n) = name
        && resource.name() != n
    {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Property;
    use crate::resource::ResourceType;

    fn resource(ty: &str, name: &str) -> Resource {
        let rt = ResourceType::builder(ty)
            .property(Property::new("name").name_property().identity())
            .actions(["create", "remove"])
            .build()
            .unwrap();
        Resource::new(rt, name)
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("group"), (Some("group".to_string()), None));
        assert_eq!(
            parse_target("group.wheel"),
            (Some("group".to_string()), Some("wheel".to_string()))
        );
        assert_eq!(
            parse_target("mount[/mnt/data.d]"),
            (Some("mount".to_string()), Some("/mnt/data.d".to_string()))
        );
    }

    #[test]
    fn test_default_action() {
        let planned = PlannedAction::new(resource("group", "wheel"));
        assert_eq!(planned.actions, vec!["create".to_string()]);
    }

    #[test]
    fn test_filter_by_target() {
        let list: RunList = [
            PlannedAction::new(resource("group", "wheel")),
            PlannedAction::new(resource("group", "staff")),
            PlannedAction::with_actions(resource("user", "adam"), ["create", "lock"]),
        ]
        .into_iter()
        .collect();
        assert_eq!(list.total_actions(), 4);

        let groups = list.clone().filter_by_target(Some("group"));
        assert_eq!(groups.len(), 2);

        let wheel = list.clone().filter_by_target(Some("group[wheel]"));
        assert_eq!(wheel.len(), 1);
        assert_eq!(wheel.entries[0].resource.name(), "wheel");

        assert_eq!(list.filter_by_target(None).len(), 3);
    }
}
