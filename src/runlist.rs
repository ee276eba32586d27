//! Run list loading
//!
//! A run list is a TOML document of `[[resource]]` tables:
//!
//! ```toml
//! [[resource]]
//! type = "group"
//! name = "wheel"
//! action = ["create", "modify"]
//!
//! [resource.properties]
//! members = ["adam", "bob"]
//! append = true
//! ```
//!
//! Every property goes through [`Resource::set`], so a bad declaration fails
//! here, before anything converges.

use anyhow::{Context, Result, bail};
use convergence::{DeprecationPolicy, PlannedAction, Resource, ResourceType, RunList, Value};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RunListFile {
    #[serde(default, rename = "resource")]
    resources: Vec<Declaration>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Declaration {
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    #[serde(default)]
    action: Option<Actions>,
    #[serde(default)]
    properties: toml::Table,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Actions {
    One(String),
    Many(Vec<String>),
}

impl Actions {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(action) => vec![action],
            Self::Many(actions) => actions,
        }
    }
}

/// Resource types a run list may declare, by name.
pub struct Catalog {
    types: BTreeMap<String, Arc<ResourceType>>,
}

impl Catalog {
    /// Every resource type shipped with steward.
    pub fn builtin() -> Result<Self> {
        let mut types = accounts::resource_types().context("Could not build account types")?;
        types.extend(filesystems::resource_types().context("Could not build filesystem types")?);
        Ok(Self::from_types(types))
    }

    pub fn from_types(types: impl IntoIterator<Item = Arc<ResourceType>>) -> Self {
        Self {
            types: types
                .into_iter()
                .map(|t| (t.name().to_string(), t))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ResourceType>> {
        self.types.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResourceType>> {
        self.types.values()
    }
}

/// Read and build a run list file.
pub fn load(path: &Path, catalog: &Catalog, policy: DeprecationPolicy) -> Result<RunList> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;
    parse(&content, catalog, policy).with_context(|| format!("Invalid run list {}", path.display()))
}

/// Build a run list from TOML text.
pub fn parse(content: &str, catalog: &Catalog, policy: DeprecationPolicy) -> Result<RunList> {
    let file: RunListFile = toml::from_str(content).context("Could not parse run list")?;
    let mut run_list = RunList::new();
    for (index, declaration) in file.resources.into_iter().enumerate() {
        let entry = build(declaration, catalog, policy)
            .with_context(|| format!("resource #{}", index + 1))?;
        run_list.push(entry);
    }
    log::debug!("Loaded {} resources", run_list.len());
    Ok(run_list)
}

fn build(
    declaration: Declaration,
    catalog: &Catalog,
    policy: DeprecationPolicy,
) -> Result<PlannedAction> {
    let Some(resource_type) = catalog.get(&declaration.resource_type) else {
        bail!("unknown resource type '{}'", declaration.resource_type);
    };
    let mut resource =
        Resource::new(Arc::clone(resource_type), &declaration.name).with_deprecation_policy(policy);

    for (property, value) in declaration.properties {
        let value = to_value(value).with_context(|| format!("{resource}: property {property}"))?;
        resource
            .set(&property, value)
            .with_context(|| format!("{resource}: property {property}"))?;
    }

    let Some(actions) = declaration.action.map(Actions::into_vec) else {
        return Ok(PlannedAction::new(resource));
    };
    if actions.is_empty() {
        bail!("{resource}: action list is empty");
    }
    if let Some(unknown) = actions
        .iter()
        .find(|action| !resource.resource_type().supports_action(action))
    {
        bail!(
            "{resource}: unknown action '{unknown}' (expected one of: {})",
            resource.resource_type().actions().join(", ")
        );
    }
    Ok(PlannedAction::with_actions(resource, actions))
}

/// Convert a TOML value into a property value.
pub fn to_value(value: toml::Value) -> Result<Value> {
    Ok(match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Integer(i),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Float(f) => bail!("floating point values are not supported ({f})"),
        toml::Value::Array(items) => {
            Value::List(items.into_iter().map(to_value).collect::<Result<_>>()?)
        }
        toml::Value::Table(table) => Value::Map(
            table
                .into_iter()
                .map(|(k, v)| to_value(v).map(|v| (k, v)))
                .collect::<Result<_>>()?,
        ),
    })
}
