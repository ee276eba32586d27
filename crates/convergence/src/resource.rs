//! Resource types, resources and current-state snapshots.

use crate::error::{Error, Result};
use crate::property::{NilResolution, Property, ValidatorRegistry};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Action accepted by every resource type; never reaches a provider.
pub const ACTION_NOTHING: &str = "nothing";

/// What `set(nil)`-as-get does with its diagnostic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeprecationPolicy {
    /// Log a warning and record it on the resource.
    #[default]
    Warn,
    /// Raise [`Error::Deprecated`].
    Error,
}

// ============================================================================
// Resource type
// ============================================================================

/// Declaration of a resource type: its properties and actions.
#[derive(Debug)]
pub struct ResourceType {
    name: String,
    properties: Vec<Property>,
    actions: Vec<String>,
    default_action: String,
}

impl ResourceType {
    pub fn builder(name: impl Into<String>) -> ResourceTypeBuilder {
        ResourceTypeBuilder {
            name: name.into(),
            properties: Vec::new(),
            actions: Vec::new(),
            default_action: None,
            validators: ValidatorRegistry::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name() == name)
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn default_action(&self) -> &str {
        &self.default_action
    }

    pub fn supports_action(&self, action: &str) -> bool {
        action == ACTION_NOTHING || self.actions.iter().any(|a| a == action)
    }

    pub fn identity_properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter().filter(|p| p.is_identity())
    }

    pub fn state_properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter().filter(|p| p.is_desired_state())
    }
}

/// Builder for [`ResourceType`]. Evaluated once at type-definition time.
pub struct ResourceTypeBuilder {
    name: String,
    properties: Vec<Property>,
    actions: Vec<String>,
    default_action: Option<String>,
    validators: ValidatorRegistry,
}

impl ResourceTypeBuilder {
    pub fn property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions.extend(actions.into_iter().map(Into::into));
        self
    }

    /// Defaults to the first declared action.
    pub fn default_action(mut self, action: impl Into<String>) -> Self {
        self.default_action = Some(action.into());
        self
    }

    pub fn validator(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&Value, &str, &Value) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.validators.register(name, f);
        self
    }

    pub fn build(self) -> Result<Arc<ResourceType>> {
        let Self {
            name,
            mut properties,
            actions,
            default_action,
            validators,
        } = self;

        if actions.is_empty() {
            return Err(Error::Configuration(format!(
                "resource type {name} declares no actions"
            )));
        }

        let mut seen = std::collections::BTreeSet::new();
        for property in &mut properties {
            if !seen.insert(property.name().to_string()) {
                return Err(Error::Configuration(format!(
                    "resource type {name} declares property {} twice",
                    property.name()
                )));
            }
            property.resolve_validators(&validators)?;
        }

        if properties.iter().filter(|p| p.is_name_property()).count() > 1 {
            return Err(Error::Configuration(format!(
                "resource type {name} declares more than one name property"
            )));
        }

        let default_action = match default_action {
            Some(action) if actions.contains(&action) || action == ACTION_NOTHING => action,
            Some(action) => {
                return Err(Error::Configuration(format!(
                    "default action {action} is not an action of {name}"
                )));
            }
            None => actions[0].clone(),
        };

        Ok(Arc::new(ResourceType {
            name,
            properties,
            actions,
            default_action,
        }))
    }
}

// ============================================================================
// Resource
// ============================================================================

/// Declared desired state: a named, sparse set of property values.
#[derive(Debug, Clone)]
pub struct Resource {
    resource_type: Arc<ResourceType>,
    name: String,
    values: BTreeMap<String, Value>,
    deprecations: DeprecationPolicy,
    diagnostics: Vec<String>,
    updated: bool,
}

impl Resource {
    pub fn new(resource_type: Arc<ResourceType>, name: impl Into<String>) -> Self {
        Self {
            resource_type,
            name: name.into(),
            values: BTreeMap::new(),
            deprecations: DeprecationPolicy::default(),
            diagnostics: Vec::new(),
            updated: false,
        }
    }

    pub fn with_deprecation_policy(mut self, policy: DeprecationPolicy) -> Self {
        self.deprecations = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    pub fn resource_type_arc(&self) -> Arc<ResourceType> {
        Arc::clone(&self.resource_type)
    }

    pub fn type_name(&self) -> &str {
        self.resource_type.name()
    }

    fn descriptor(&self, property: &str) -> Result<&Property> {
        self.resource_type.property(property).ok_or_else(|| {
            Error::Configuration(format!(
                "{} has no property named {property}",
                self.resource_type.name()
            ))
        })
    }

    /// The single accessor: `None` reads, `Some(v)` writes.
    ///
    /// `Some(Value::Nil)` is resolved per [`Property::resolve_nil`].
    pub fn call(&mut self, property: &str, value: Option<Value>) -> Result<Value> {
        match value {
            None => self.get(property),
            Some(Value::Nil) => self.set_nil(property),
            Some(value) => {
                let descriptor = self.descriptor(property)?;
                let value = descriptor.coerce_value(value)?;
                descriptor.validate(&value)?;
                self.values.insert(property.to_string(), value.clone());
                Ok(value)
            }
        }
    }

    /// Set a property. Nil follows the ambiguous-nil rules.
    pub fn set(&mut self, property: &str, value: impl Into<Value>) -> Result<Value> {
        self.call(property, Some(value.into()))
    }

    fn set_nil(&mut self, property: &str) -> Result<Value> {
        let descriptor = self.descriptor(property)?;
        match descriptor.resolve_nil() {
            NilResolution::Reset => {
                self.values.remove(property);
                Ok(Value::Nil)
            }
            NilResolution::Store => {
                let value = descriptor.coerce_value(Value::Nil)?;
                descriptor.validate(&value)?;
                self.values.insert(property.to_string(), value.clone());
                Ok(value)
            }
            NilResolution::Get => {
                let current = self.get_opt(property)?.unwrap_or(Value::Nil);
                let message = format!(
                    "{self}: {property}(nil) does not reset {property}; it reads the current value {} instead. Declare nil as an allowed value to set it.",
                    descriptor.display_value(&current)
                );
                match self.deprecations {
                    DeprecationPolicy::Error => Err(Error::Deprecated(message)),
                    DeprecationPolicy::Warn => {
                        log::warn!("{message}");
                        self.diagnostics.push(message);
                        Ok(current)
                    }
                }
            }
        }
    }

    /// Read a property: stored value, else default, else `Required`.
    pub fn get(&self, property: &str) -> Result<Value> {
        let descriptor = self.descriptor(property)?;
        if let Some(value) = self.values.get(property) {
            return Ok(value.clone());
        }
        if let Some(value) = descriptor.default_for(self)? {
            return Ok(value);
        }
        if descriptor.is_required() {
            return Err(Error::Required {
                property: property.to_string(),
            });
        }
        Ok(Value::Nil)
    }

    /// Read a property without enforcing `required`; nil becomes `None`.
    pub fn get_opt(&self, property: &str) -> Result<Option<Value>> {
        let descriptor = self.descriptor(property)?;
        let value = match self.values.get(property) {
            Some(value) => Some(value.clone()),
            None => descriptor.default_for(self)?,
        };
        Ok(value.filter(|v| !v.is_nil()))
    }

    pub fn is_set(&self, property: &str) -> bool {
        self.values.contains_key(property)
    }

    pub fn reset(&mut self, property: &str) -> Result<()> {
        self.descriptor(property)?;
        self.values.remove(property);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Typed helpers for providers
    // ------------------------------------------------------------------------

    pub fn get_string(&self, property: &str) -> Result<Option<String>> {
        Ok(self.get_opt(property)?.map(|v| v.to_s()))
    }

    pub fn get_integer(&self, property: &str) -> Result<Option<i64>> {
        Ok(self.get_opt(property)?.and_then(|v| match v {
            Value::Integer(i) => Some(i),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }))
    }

    /// Truthiness of the property; unset reads as false.
    pub fn get_bool(&self, property: &str) -> Result<bool> {
        Ok(self.get_opt(property)?.is_some_and(|v| v.is_truthy()))
    }

    /// String list; a scalar becomes a one-element list.
    pub fn get_list(&self, property: &str) -> Result<Vec<String>> {
        Ok(match self.get_opt(property)? {
            None => Vec::new(),
            Some(Value::List(items)) => items.iter().map(Value::to_s).collect(),
            Some(other) => vec![other.to_s()],
        })
    }

    // ------------------------------------------------------------------------
    // Identity and state
    // ------------------------------------------------------------------------

    /// The identity properties' values, or the resource name when the
    /// type declares none.
    pub fn identity(&self) -> Result<Value> {
        let props: Vec<&Property> = self.resource_type.identity_properties().collect();
        match props.as_slice() {
            [] => Ok(Value::String(self.name.clone())),
            [only] => self.get(only.name()),
            many => {
                let mut map = BTreeMap::new();
                for p in many {
                    map.insert(p.name().to_string(), self.get(p.name())?);
                }
                Ok(Value::Map(map))
            }
        }
    }

    /// Desired-state properties that have a value or default.
    pub fn state(&self) -> Result<BTreeMap<String, Value>> {
        let mut state = BTreeMap::new();
        for p in self.resource_type.state_properties() {
            if let Some(value) = self.get_opt(p.name())? {
                state.insert(p.name().to_string(), value);
            }
        }
        Ok(state)
    }

    pub fn updated_by_last_action(&self) -> bool {
        self.updated
    }

    pub fn set_updated(&mut self, updated: bool) {
        self.updated = updated;
    }

    /// Deprecation diagnostics recorded while declaring this resource.
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.resource_type.name(), self.name)
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Observed state of the live system, shaped like the resource it mirrors.
#[derive(Debug, Clone)]
pub struct Snapshot {
    inner: Resource,
}

impl Snapshot {
    /// Empty snapshot carrying `new`'s identity.
    pub fn for_resource(new: &Resource) -> Self {
        let mut inner = Resource::new(new.resource_type_arc(), new.name());
        for p in new.resource_type().identity_properties() {
            if let Ok(Some(value)) = new.get_opt(p.name()) {
                inner.values.insert(p.name().to_string(), value);
            }
        }
        Self { inner }
    }

    /// Record an observed value. Nil forgets the property.
    pub fn observe(&mut self, property: &str, value: impl Into<Value>) -> Result<()> {
        self.inner.descriptor(property)?;
        let value = value.into();
        if value.is_nil() {
            self.inner.values.remove(property);
        } else {
            self.inner.values.insert(property.to_string(), value);
        }
        Ok(())
    }

    /// Observed value, ignoring defaults.
    pub fn observed(&self, property: &str) -> Option<&Value> {
        self.inner.values.get(property)
    }

    pub fn into_resource(self) -> Resource {
        self.inner
    }
}

impl Deref for Snapshot {
    type Target = Resource;

    fn deref(&self) -> &Resource {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::property::coerce_comma_list;
    use crate::value::ValueKind;

    fn thing_type() -> Arc<ResourceType> {
        ResourceType::builder("thing")
            .property(Property::new("label").name_property().identity())
            .property(Property::new("x").kind_of([ValueKind::Integer]))
            .property(Property::new("bare").allow([ValueKind::String]).default("dflt"))
            .property(Property::new("req").required())
            .property(Property::new("maybe").is([ValueKind::String, ValueKind::Nil]))
            .property(Property::new("typed").kind_of([ValueKind::String, ValueKind::Nil]))
            .property(Property::new("tags").coerce(|v| match v {
                Value::Nil => Ok(Value::strings(["none"])),
                other => coerce_comma_list(other),
            }))
            .property(
                Property::new("doubled")
                    .lazy_default(|r| Ok(Value::from(r.get_integer("x")?.unwrap_or(0) * 2))),
            )
            .property(Property::new("observed").desired_state(false))
            .actions(["create", "remove"])
            .build()
            .unwrap()
    }

    fn thing() -> Resource {
        Resource::new(thing_type(), "t1")
    }

    #[test]
    fn test_display() {
        assert_eq!(thing().to_string(), "thing[t1]");
    }

    #[test]
    fn test_name_property_default() {
        let r = thing();
        assert_eq!(r.get("label").unwrap(), Value::from("t1"));
        assert!(!r.is_set("label"));
        assert_eq!(r.identity().unwrap(), Value::from("t1"));
    }

    #[test]
    fn test_failed_set_leaves_value_unchanged() {
        let mut r = thing();
        r.set("x", 1).unwrap();
        let err = r.set("x", "nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert_eq!(r.get("x").unwrap(), Value::from(1));
    }

    #[test]
    fn test_nil_set_without_allowed_nil_is_get() {
        let mut r = thing();
        r.set("x", 5).unwrap();
        let got = r.set("x", Value::Nil).unwrap();
        assert_eq!(got, Value::from(5));
        assert!(r.is_set("x"));
        assert_eq!(r.diagnostics().len(), 1);
    }

    #[test]
    fn test_nil_set_with_error_policy_raises_deprecated() {
        let mut r = thing().with_deprecation_policy(DeprecationPolicy::Error);
        r.set("x", 5).unwrap();
        let err = r.set("x", Value::Nil).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Deprecated);
        assert_eq!(r.get("x").unwrap(), Value::from(5));
    }

    #[test]
    fn test_bare_nil_resets() {
        let mut r = thing();
        r.set("bare", "value").unwrap();
        assert!(r.is_set("bare"));
        r.set("bare", Value::Nil).unwrap();
        assert!(!r.is_set("bare"));
        assert_eq!(r.get("bare").unwrap(), Value::from("dflt"));
    }

    #[test]
    fn test_explicit_nil_is_stored() {
        let mut r = thing();
        r.set("maybe", "a").unwrap();
        r.set("maybe", Value::Nil).unwrap();
        assert!(r.is_set("maybe"));
        assert_eq!(r.get("maybe").unwrap(), Value::Nil);
    }

    #[test]
    fn test_kind_of_nil_is_not_explicit() {
        let mut r = thing();
        r.set("typed", "x").unwrap();
        assert_eq!(r.set("typed", Value::Nil).unwrap(), Value::from("x"));
        assert_eq!(r.get("typed").unwrap(), Value::from("x"));
        assert_eq!(r.diagnostics().len(), 1);
    }

    #[test]
    fn test_coerced_nil_is_set_through_coercion() {
        let mut r = thing();
        r.set("tags", "a, b").unwrap();
        assert_eq!(r.set("tags", Value::Nil).unwrap(), Value::strings(["none"]));
        assert_eq!(r.get("tags").unwrap(), Value::strings(["none"]));
        assert!(r.diagnostics().is_empty());
    }

    #[test]
    fn test_required_scenario() {
        let mut r = thing().with_deprecation_policy(DeprecationPolicy::Error);
        assert_eq!(r.get("req").unwrap_err().kind(), ErrorKind::Required);
        r.set("req", 1).unwrap();
        assert_eq!(r.get("req").unwrap(), Value::from(1));
        assert_eq!(
            r.set("req", Value::Nil).unwrap_err().kind(),
            ErrorKind::Deprecated
        );
        assert_eq!(r.get("req").unwrap(), Value::from(1));
    }

    #[test]
    fn test_nil_get_on_unset_required_does_not_raise() {
        let mut r = thing();
        assert_eq!(r.set("req", Value::Nil).unwrap(), Value::Nil);
        assert!(!r.is_set("req"));
    }

    #[test]
    fn test_lazy_default_sees_resource() {
        let mut r = thing();
        assert_eq!(r.get("doubled").unwrap(), Value::from(0));
        r.set("x", 21).unwrap();
        assert_eq!(r.get("doubled").unwrap(), Value::from(42));
    }

    #[test]
    fn test_unknown_property() {
        let mut r = thing();
        assert_eq!(
            r.set("nope", 1).unwrap_err().kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn test_state_excludes_non_desired_state() {
        let mut r = thing();
        r.set("x", 3).unwrap();
        let state = r.state().unwrap();
        assert_eq!(state.get("x"), Some(&Value::from(3)));
        assert_eq!(state.get("doubled"), Some(&Value::from(6)));
        assert!(!state.contains_key("observed"));
    }

    #[test]
    fn test_snapshot_copies_identity_only() {
        let mut r = thing();
        r.set("x", 3).unwrap();
        let mut snap = Snapshot::for_resource(&r);
        assert_eq!(snap.observed("label"), Some(&Value::from("t1")));
        assert!(snap.observed("x").is_none());
        snap.observe("x", 4).unwrap();
        assert_eq!(snap.get("x").unwrap(), Value::from(4));
        snap.observe("x", Value::Nil).unwrap();
        assert!(snap.observed("x").is_none());
    }

    #[test]
    fn test_builder_rejects_duplicates_and_bad_default_action() {
        let err = ResourceType::builder("dup")
            .property(Property::new("a"))
            .property(Property::new("a"))
            .actions(["create"])
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = ResourceType::builder("bad")
            .actions(["create"])
            .default_action("explode")
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_builder_resolves_validators() {
        let ty = ResourceType::builder("v")
            .property(Property::new("n").validate_with("small", 3))
            .validator("small", |opts, name, value| {
                if value.as_integer() > opts.as_integer() {
                    return Err(Error::ValidationFailed(format!("{name} too big")));
                }
                Ok(())
            })
            .actions(["create"])
            .build()
            .unwrap();
        let mut r = Resource::new(ty, "v");
        assert!(r.set("n", 2).is_ok());
        assert_eq!(r.set("n", 9).unwrap_err().to_string(), "n too big");
    }

    #[test]
    fn test_supports_nothing_action() {
        let ty = thing_type();
        assert!(ty.supports_action("nothing"));
        assert!(ty.supports_action("create"));
        assert!(!ty.supports_action("explode"));
        assert_eq!(ty.default_action(), "create");
    }
}
