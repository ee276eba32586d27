//! Property descriptors: validation, coercion and defaults for one named
//! attribute of a resource type.
//!
//! A [`Property`] is declared once per resource type with a builder and
//! then shared by every [`Resource`] of that type. Validation is
//! conjunctive across constraint categories and disjunctive within a
//! category: `kind_of([String, Symbol])` accepts either kind, but a
//! property with both `kind_of` and `regex` must satisfy both.
//!
//! ## Nil handling
//!
//! Setting a property to `Nil` is ambiguous. [`NilResolution`] captures
//! the three outcomes:
//!
//! - bare allow-list only ([`Property::allow`]) resets the property
//! - nil explicitly allowed stores it (or resets when nil is the only
//!   allowed value)
//! - anything else is a read that emits a deprecation diagnostic

use crate::error::{Error, Result};
use crate::resource::Resource;
use crate::value::{Value, ValueKind};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Predicate over a candidate value.
pub type Callback = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Transformation applied to a value before validation and storage.
pub type CoerceFn = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

/// Deferred default computed from the owning resource.
pub type LazyDefault = Arc<dyn Fn(&Resource) -> Result<Value> + Send + Sync>;

/// Named validator: `(declared options, property name, candidate value)`.
pub type ValidatorFn = Arc<dyn Fn(&Value, &str, &Value) -> Result<()> + Send + Sync>;

// ============================================================================
// Allowed values
// ============================================================================

/// One entry of an allow list (`is:` or the bare positional form).
#[derive(Clone)]
pub enum Allowed {
    /// Value must be of this kind.
    Kind(ValueKind),
    /// Value must equal this value.
    Equal(Value),
    /// Value must be a string matching this pattern.
    Pattern(Regex),
    /// Value must satisfy this predicate.
    Predicate(String, Callback),
}

impl Allowed {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Kind(kind) => value.kind() == *kind,
            Self::Equal(expected) => value == expected,
            Self::Pattern(re) => value.as_str().is_some_and(|s| re.is_match(s)),
            Self::Predicate(_, f) => f(value),
        }
    }

    pub fn allows_nil(&self) -> bool {
        matches!(self, Self::Kind(ValueKind::Nil) | Self::Equal(Value::Nil))
    }

    /// Predicate entry with a display name.
    pub fn predicate(
        name: impl Into<String>,
        f: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::Predicate(name.into(), Arc::new(f))
    }
}

impl fmt::Display for Allowed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kind(kind) => write!(f, "{kind}"),
            Self::Equal(v) => write!(f, "{v}"),
            Self::Pattern(re) => write!(f, "/{}/", re.as_str()),
            Self::Predicate(name, _) => f.write_str(name),
        }
    }
}

impl From<ValueKind> for Allowed {
    fn from(kind: ValueKind) -> Self {
        Self::Kind(kind)
    }
}

impl From<Value> for Allowed {
    fn from(value: Value) -> Self {
        Self::Equal(value)
    }
}

impl From<&str> for Allowed {
    fn from(s: &str) -> Self {
        Self::Equal(Value::from(s))
    }
}

impl From<Regex> for Allowed {
    fn from(re: Regex) -> Self {
        Self::Pattern(re)
    }
}

// ============================================================================
// Named validators
// ============================================================================

/// Registry of named validators, attached to a resource type.
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    validators: BTreeMap<String, ValidatorFn>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&Value, &str, &Value) -> Result<()> + Send + Sync + 'static,
    ) {
        self.validators.insert(name.into(), Arc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<ValidatorFn> {
        self.validators.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.validators.keys().map(String::as_str)
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.validators.keys()).finish()
    }
}

#[derive(Clone)]
struct NamedCheck {
    name: String,
    options: Value,
    resolved: Option<ValidatorFn>,
}

// ============================================================================
// Defaults
// ============================================================================

/// How a property obtains a value when none was set.
#[derive(Clone)]
pub enum DefaultValue {
    /// A fixed value.
    Value(Value),
    /// Computed from the owning resource on every read.
    Lazy(LazyDefault),
    /// The owning resource's name.
    NameProperty,
}

/// Outcome of setting a property to nil.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NilResolution {
    /// Clear the stored value.
    Reset,
    /// Store nil as a real value.
    Store,
    /// Treat the call as a read and emit a deprecation diagnostic.
    Get,
}

// ============================================================================
// Property
// ============================================================================

/// Descriptor for a single property of a resource type.
#[derive(Clone)]
pub struct Property {
    name: String,
    bare: Vec<Allowed>,
    is: Vec<Allowed>,
    kind_of: Option<Vec<ValueKind>>,
    equal_to: Option<Vec<Value>>,
    regex: Option<Vec<Regex>>,
    callbacks: Vec<(String, Callback)>,
    respond_to: Option<Vec<String>>,
    cannot_be: Option<Vec<String>>,
    checks: Vec<NamedCheck>,
    required: bool,
    identity: bool,
    desired_state: bool,
    sensitive: bool,
    default: Option<DefaultValue>,
    coerce: Option<CoerceFn>,
    description: Option<String>,
}

impl Property {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bare: Vec::new(),
            is: Vec::new(),
            kind_of: None,
            equal_to: None,
            regex: None,
            callbacks: Vec::new(),
            respond_to: None,
            cannot_be: None,
            checks: Vec::new(),
            required: false,
            identity: false,
            desired_state: true,
            sensitive: false,
            default: None,
            coerce: None,
            description: None,
        }
    }

    // ------------------------------------------------------------------------
    // Builder
    // ------------------------------------------------------------------------

    /// Bare positional allow list, e.g. `property :x, [String, nil]`.
    pub fn allow<I, A>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Allowed>,
    {
        self.bare.extend(allowed.into_iter().map(Into::into));
        self
    }

    /// Keyword allow list (`is:`).
    pub fn is<I, A>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Allowed>,
    {
        self.is.extend(allowed.into_iter().map(Into::into));
        self
    }

    pub fn kind_of<I: IntoIterator<Item = ValueKind>>(mut self, kinds: I) -> Self {
        self.kind_of
            .get_or_insert_with(Vec::new)
            .extend(kinds);
        self
    }

    pub fn equal_to<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.equal_to
            .get_or_insert_with(Vec::new)
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn regex<I: IntoIterator<Item = Regex>>(mut self, patterns: I) -> Self {
        self.regex.get_or_insert_with(Vec::new).extend(patterns);
        self
    }

    pub fn callback(
        mut self,
        description: impl Into<String>,
        f: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.push((description.into(), Arc::new(f)));
        self
    }

    pub fn respond_to<I, S>(mut self, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.respond_to
            .get_or_insert_with(Vec::new)
            .extend(operations.into_iter().map(Into::into));
        self
    }

    pub fn cannot_be<I, S>(mut self, predicates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cannot_be
            .get_or_insert_with(Vec::new)
            .extend(predicates.into_iter().map(Into::into));
        self
    }

    /// Validate with a named validator registered on the resource type.
    pub fn validate_with(mut self, name: impl Into<String>, options: impl Into<Value>) -> Self {
        self.checks.push(NamedCheck {
            name: name.into(),
            options: options.into(),
            resolved: None,
        });
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    pub fn desired_state(mut self, desired_state: bool) -> Self {
        self.desired_state = desired_state;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    pub fn lazy_default(
        mut self,
        f: impl Fn(&Resource) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.default = Some(DefaultValue::Lazy(Arc::new(f)));
        self
    }

    /// Default to the resource's name.
    pub fn name_property(mut self) -> Self {
        self.default = Some(DefaultValue::NameProperty);
        self
    }

    pub fn coerce(mut self, f: impl Fn(Value) -> Result<Value> + Send + Sync + 'static) -> Self {
        self.coerce = Some(Arc::new(f));
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_identity(&self) -> bool {
        self.identity
    }

    pub fn is_desired_state(&self) -> bool {
        self.desired_state
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    pub fn is_name_property(&self) -> bool {
        matches!(self.default, Some(DefaultValue::NameProperty))
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Named validators this property references.
    pub fn validator_names(&self) -> impl Iterator<Item = &str> {
        self.checks.iter().map(|c| c.name.as_str())
    }

    /// Bind every `validate_with` entry to a registered validator.
    pub(crate) fn resolve_validators(&mut self, registry: &ValidatorRegistry) -> Result<()> {
        for check in &mut self.checks {
            let Some(f) = registry.get(&check.name) else {
                return Err(Error::Configuration(format!(
                    "property {} references unknown validator {}",
                    self.name, check.name
                )));
            };
            check.resolved = Some(f);
        }
        Ok(())
    }

    fn allowed(&self) -> impl Iterator<Item = &Allowed> {
        self.bare.iter().chain(self.is.iter())
    }

    fn has_keyword_constraints(&self) -> bool {
        !self.is.is_empty()
            || self.kind_of.is_some()
            || self.equal_to.is_some()
            || self.regex.is_some()
            || !self.callbacks.is_empty()
            || self.respond_to.is_some()
            || self.cannot_be.is_some()
            || !self.checks.is_empty()
    }

    /// Whether `set(nil)` is a real set: the property has a coercion, or nil
    /// is a declared allowed value. `kind_of` alone does not count.
    pub fn explicitly_accepts_nil(&self) -> bool {
        self.coerce.is_some() || self.allowed().any(Allowed::allows_nil)
    }

    /// Decide what `set(nil)` means for this property.
    pub fn resolve_nil(&self) -> NilResolution {
        if !self.bare.is_empty() && !self.has_keyword_constraints() {
            return NilResolution::Reset;
        }
        if !self.explicitly_accepts_nil() {
            return NilResolution::Get;
        }
        let mut allowed = self.allowed().peekable();
        if allowed.peek().is_some() && allowed.all(Allowed::allows_nil) {
            NilResolution::Reset
        } else {
            NilResolution::Store
        }
    }

    // ------------------------------------------------------------------------
    // Coercion, defaults, validation
    // ------------------------------------------------------------------------

    /// Apply the coercion function, if any.
    pub fn coerce_value(&self, value: Value) -> Result<Value> {
        match &self.coerce {
            Some(f) => f(value),
            None => Ok(value),
        }
    }

    /// Compute the default for `resource`, coerced. `None` when the
    /// property has no default.
    pub fn default_for(&self, resource: &Resource) -> Result<Option<Value>> {
        let raw = match &self.default {
            None => return Ok(None),
            Some(DefaultValue::Value(v)) => v.clone(),
            Some(DefaultValue::Lazy(f)) => f(resource)?,
            Some(DefaultValue::NameProperty) => Value::String(resource.name().to_string()),
        };
        let value = self.coerce_value(raw)?;
        if matches!(self.default, Some(DefaultValue::Lazy(_))) {
            self.validate(&value)?;
        }
        Ok(Some(value))
    }

    /// Validate `value` against every configured constraint category.
    pub fn validate(&self, value: &Value) -> Result<()> {
        let name = &self.name;

        if value.is_nil() && self.required {
            return Err(Error::ValidationFailed(format!(
                "Required argument {name} is missing!"
            )));
        }

        let allowed: Vec<&Allowed> = self.allowed().collect();
        if !allowed.is_empty() && !allowed.iter().any(|a| a.matches(value)) {
            let list = allowed
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Error::ValidationFailed(format!(
                "Option {name} must be one of: {list}!  You passed {value}."
            )));
        }

        if value.is_nil() {
            return Ok(());
        }

        if let Some(kinds) = &self.kind_of {
            if !kinds.contains(&value.kind()) {
                let list = kinds
                    .iter()
                    .map(ValueKind::name)
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(Error::ValidationFailed(format!(
                    "Option {name} must be a kind of [{list}]!  You passed {value}."
                )));
            }
        }

        if let Some(values) = &self.equal_to {
            if !values.contains(value) {
                let list = values
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(Error::ValidationFailed(format!(
                    "Option {name} must be equal to one of: {list}!  You passed {value}."
                )));
            }
        }

        if let Some(patterns) = &self.regex {
            let matched = value
                .as_str()
                .is_some_and(|s| patterns.iter().any(|re| re.is_match(s)));
            if !matched {
                let list = patterns
                    .iter()
                    .map(Regex::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(Error::ValidationFailed(format!(
                    "Option {name}'s value {value} does not match regular expression [{list}]"
                )));
            }
        }

        for (description, f) in &self.callbacks {
            if !f(value) {
                return Err(Error::ValidationFailed(format!(
                    "Option {name}'s value {value} {description}!"
                )));
            }
        }

        if let Some(operations) = &self.respond_to {
            if !operations.iter().any(|op| value.responds_to(op)) {
                return Err(Error::ValidationFailed(format!(
                    "Option {name} must have a {} method!",
                    operations.join(" or ")
                )));
            }
        }

        if let Some(predicates) = &self.cannot_be {
            for predicate in predicates {
                if value.predicate(predicate) == Some(true) {
                    return Err(Error::ValidationFailed(format!(
                        "Option {name} cannot be {predicate}"
                    )));
                }
            }
        }

        for check in &self.checks {
            match &check.resolved {
                Some(f) => f(&check.options, name, value)?,
                None => {
                    return Err(Error::Configuration(format!(
                        "validator {} for property {name} was never resolved",
                        check.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Render a value for change descriptions, honoring `sensitive`.
    pub fn display_value(&self, value: &Value) -> String {
        if self.sensitive {
            "*sensitive value suppressed*".to_string()
        } else {
            value.to_string()
        }
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("required", &self.required)
            .field("identity", &self.identity)
            .field("desired_state", &self.desired_state)
            .field("sensitive", &self.sensitive)
            .field("has_default", &self.default.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Common coercions
// ============================================================================

/// Split a comma-separated string into a list of trimmed strings.
pub fn coerce_comma_list(value: Value) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::List(
            s.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(Value::from)
                .collect(),
        )),
        other => Ok(other),
    }
}

/// Turn strings into symbols, stripping a leading `:`.
pub fn coerce_symbol(value: Value) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::Symbol(s.trim_start_matches(':').to_string())),
        other => Ok(other),
    }
}
