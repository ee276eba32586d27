//! The `file` resource: content of a single regular file.

use convergence::{
    ConvergeActions, ErrorKind, PlatformPredicate, Property, Provider, ProviderContext,
    ProviderRegistry, Requirements, ResourceType, Result, Scope, Snapshot, ValueKind,
    unsupported_action,
};
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const PROVIDER_NAME: &str = "file::default";

pub fn resource_type() -> Result<Arc<ResourceType>> {
    ResourceType::builder("file")
        .property(
            Property::new("path")
                .name_property()
                .identity()
                .kind_of([ValueKind::String]),
        )
        .property(Property::new("content").is([ValueKind::String, ValueKind::Nil]))
        .property(
            Property::new("sensitive")
                .kind_of([ValueKind::Bool])
                .default(false)
                .desired_state(false),
        )
        .property(Property::new("checksum").desired_state(false))
        .actions(["create", "create_if_missing", "delete"])
        .build()
}

pub fn register(registry: &mut ProviderRegistry) -> Result<()> {
    registry.provides("file", PlatformPredicate::Default, PROVIDER_NAME, |_| {
        Box::new(FileProvider::default())
    })
}

/// blake3 hex digest of `content`.
pub fn checksum(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

/// Diff lines for a change description.
fn diff_lines(old: &str, new: &str) -> Vec<String> {
    TextDiff::from_lines(old, new)
        .iter_all_changes()
        .filter_map(|change| {
            let sign = match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => return None,
            };
            Some(format!("  {sign} {}", change.value().trim_end_matches('\n')))
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct FileProvider {
    path: PathBuf,
    is_dir: bool,
    existing: Option<String>,
    current: Option<Snapshot>,
}

impl FileProvider {
    fn write(&self, ctx: &ProviderContext<'_>, content: &str) -> Result<()> {
        ctx.system.fs.write_atomic(&self.path, content)
    }

    fn describe(
        &self,
        ctx: &ProviderContext<'_>,
        headline: String,
        old: &str,
        new: &str,
    ) -> Result<Vec<String>> {
        let mut descriptions = vec![headline];
        if ctx.new_resource.get_bool("sensitive")? {
            descriptions.push("  suppressed sensitive resource".to_string());
        } else {
            descriptions.extend(diff_lines(old, new));
        }
        Ok(descriptions)
    }

    fn action_create(
        &self,
        ctx: &ProviderContext<'_>,
        converge: &mut ConvergeActions,
        only_if_missing: bool,
    ) -> Result<()> {
        let desired = ctx.new_resource.get_string("content")?;
        match (&self.existing, desired) {
            (None, desired) => {
                let content = desired.unwrap_or_default();
                let descriptions = self.describe(
                    ctx,
                    format!("create new file {}", self.path.display()),
                    "",
                    &content,
                )?;
                converge.converge_by(descriptions, || self.write(ctx, &content))
            }
            (Some(_), _) if only_if_missing => {
                log::debug!("{} exists - create_if_missing skipped", ctx.new_resource);
                Ok(())
            }
            (Some(_), None) => Ok(()),
            (Some(existing), Some(content)) => {
                let (old, new) = (checksum(existing), checksum(&content));
                if old == new {
                    log::debug!("{} content is up to date", ctx.new_resource);
                    return Ok(());
                }
                let descriptions = self.describe(
                    ctx,
                    format!(
                        "update content in file {} from {} to {}",
                        self.path.display(),
                        &old[..8],
                        &new[..8]
                    ),
                    existing,
                    &content,
                )?;
                converge.converge_by(descriptions, || self.write(ctx, &content))
            }
        }
    }

    fn action_delete(&self, ctx: &ProviderContext<'_>, converge: &mut ConvergeActions) -> Result<()> {
        if self.existing.is_none() {
            return Ok(());
        }
        converge.converge_by(format!("delete file {}", self.path.display()), || {
            ctx.system.fs.remove(&self.path)
        })
    }
}

impl Provider for FileProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn load_current_resource(&mut self, ctx: &ProviderContext<'_>) -> Result<()> {
        let fs = ctx.system.fs;
        self.path = PathBuf::from(ctx.new_resource.get("path")?.to_s());
        self.is_dir = fs.is_dir(&self.path);
        self.existing = if self.is_dir {
            None
        } else {
            fs.read_optional(&self.path)?
        };
        self.current = match &self.existing {
            Some(content) => {
                let mut snapshot = Snapshot::for_resource(ctx.new_resource);
                snapshot.observe("content", content.as_str())?;
                snapshot.observe("checksum", checksum(content))?;
                Some(snapshot)
            }
            None => None,
        };
        Ok(())
    }

    fn current_resource(&self) -> Option<&Snapshot> {
        self.current.as_ref()
    }

    fn define_resource_requirements<'a>(
        &'a self,
        ctx: &ProviderContext<'a>,
        requirements: &mut Requirements<'a>,
    ) {
        let fs = ctx.system.fs;
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("/"));

        requirements
            .assert(Scope::actions(["create", "create_if_missing"]))
            .assertion(move || fs.is_dir(parent))
            .failure_message(
                ErrorKind::MissingPrerequisite,
                format!("Parent directory {} does not exist.", parent.display()),
            )
            .whyrun(format!(
                "Assuming directory {} would have been created",
                parent.display()
            ));

        let is_dir = self.is_dir;
        requirements
            .assert(Scope::All)
            .assertion(move || !is_dir)
            .failure_message(
                ErrorKind::PreconditionFailed,
                format!(
                    "Cannot manage {}: it is a directory",
                    self.path.display()
                ),
            );
    }

    fn action(
        &mut self,
        action: &str,
        ctx: &ProviderContext<'_>,
        converge: &mut ConvergeActions,
    ) -> Result<()> {
        match action {
            "create" => self.action_create(ctx, converge, false),
            "create_if_missing" => self.action_create(ctx, converge, true),
            "delete" => self.action_delete(ctx, converge),
            other => Err(unsupported_action(self.name(), ctx.new_resource, other)),
        }
    }
}
