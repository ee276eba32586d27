//! `steward facts`, `steward resolve` and `steward types`.

use super::{Machine, registry};
use crate::Context;
use crate::runlist::Catalog;
use crate::ui;
use anyhow::Result;
use colored::Colorize;
use convergence::{DefaultValue, NodeFacts, Property, ProviderRegistry, ResourceType};

pub fn facts(ctx: &Context) -> Result<()> {
    let machine = Machine::load(ctx)?;
    ui::header("Node facts");
    for (key, value) in fact_rows(&machine.node) {
        ui::kv(key, value);
    }
    Ok(())
}

fn fact_rows(node: &NodeFacts) -> [(&'static str, &str); 4] {
    [
        ("platform", node.platform.as_str()),
        ("platform_family", node.platform_family.as_str()),
        ("os", node.os.as_str()),
        ("platform_version", node.platform_version.as_str()),
    ]
}

pub fn resolve(ctx: &Context, types: &[String]) -> Result<()> {
    let machine = Machine::load(ctx)?;
    let registry = registry()?;
    let types: Vec<String> = if types.is_empty() {
        registry.resource_types().map(str::to_string).collect()
    } else {
        types.to_vec()
    };

    ui::header(&format!("Providers for {}", machine.node));
    for resource_type in &types {
        ui::section(resource_type);
        for line in resolution_lines(&registry, resource_type, &machine.node) {
            println!("  {line}");
        }
    }
    Ok(())
}

/// One line per registration, the selected one marked with `→`.
fn resolution_lines(
    registry: &ProviderRegistry,
    resource_type: &str,
    node: &NodeFacts,
) -> Vec<String> {
    let candidates = registry.candidates(resource_type, node);
    if candidates.is_empty() {
        return vec![format!("{}", "no providers registered".yellow())];
    }
    let selected = match registry.resolve(resource_type, node) {
        Ok(registration) => Some(registration.provider),
        Err(e) => {
            log::debug!("{resource_type}: {e}");
            None
        }
    };

    let mut lines: Vec<String> = candidates
        .iter()
        .map(|candidate| {
            let registration = candidate.registration;
            let marker = if selected == Some(registration.provider) {
                "→".green().to_string()
            } else if candidate.matches {
                "·".to_string()
            } else {
                " ".to_string()
            };
            let mut detail = format!(
                "{}, {} specificity",
                registration.predicate,
                registration.predicate.specificity()
            );
            if registration.overrides {
                detail.push_str(", override");
            }
            if !candidate.matches {
                detail.push_str(", no match");
            }
            format!("{marker} {} {}", registration.provider, format!("({detail})").dimmed())
        })
        .collect();

    if selected.is_none()
        && let Err(e) = registry.resolve(resource_type, node)
    {
        lines.push(format!("{}", e.to_string().red()));
    }
    lines
}

pub fn types() -> Result<()> {
    let catalog = Catalog::builtin()?;
    for resource_type in catalog.iter() {
        ui::section(resource_type.name());
        for line in describe_type(resource_type) {
            println!("  {line}");
        }
    }
    Ok(())
}

fn describe_type(resource_type: &ResourceType) -> Vec<String> {
    let mut lines = vec![format!(
        "actions: {} (default: {})",
        resource_type.actions().join(", "),
        resource_type.default_action()
    )];
    lines.extend(resource_type.properties().iter().map(describe_property));
    lines
}

fn describe_property(property: &Property) -> String {
    let mut flags = Vec::new();
    if property.is_identity() {
        flags.push("identity".to_string());
    }
    if property.is_name_property() {
        flags.push("name".to_string());
    }
    if property.is_required() {
        flags.push("required".to_string());
    }
    if !property.is_desired_state() {
        flags.push("not desired state".to_string());
    }
    if property.is_sensitive() {
        flags.push("sensitive".to_string());
    }
    match property.default_value() {
        Some(DefaultValue::Value(value)) => flags.push(format!("default {value}")),
        Some(DefaultValue::Lazy(_)) => flags.push("computed default".to_string()),
        Some(DefaultValue::NameProperty) | None => {}
    }

    let mut line = format!("{:<18}", property.name());
    if !flags.is_empty() {
        line.push_str(&format!("{}", flags.join(", ").dimmed()));
    }
    if let Some(text) = property.description_text() {
        line.push_str(&format!("  {text}"));
    }
    line.trim_end().to_string()
}
