//! The `mount` resource: filesystems mounted now (`mount`, `umount`,
//! `remount`) and at boot (`enable`, `disable`).
//!
//! One generic [`MountProvider`] carries the action logic; a
//! [`MountFlavor`] supplies the table format, live-mount probe and command
//! syntax of each platform.

pub mod flavor;
pub mod probe;
pub mod table;

pub use flavor::{FindmntFlavor, MountFlavor, MountOutputFlavor, SolarisFlavor};

use crate::mount::probe::LiveMount;
use crate::mount::table::TableEntry;
use convergence::property::{coerce_comma_list, coerce_symbol};
use convergence::{
    ConvergeActions, Error, ErrorKind, PlatformPredicate, Property, Provider, ProviderContext,
    ProviderRegistry, Requirements, Resource, ResourceType, Result, Scope, ShellCommand,
    Snapshot, Value, ValueKind, unsupported_action,
};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

/// Filesystems whose device is not a path on this node.
const VIRTUAL_FSTYPES: &[&str] = &["cgroup", "tmpfs", "fuse", "vboxsf", "zfs"];

pub fn resource_type() -> Result<Arc<ResourceType>> {
    let mut supports = BTreeMap::new();
    supports.insert("remount".to_string(), Value::Bool(false));

    ResourceType::builder("mount")
        .property(
            Property::new("mount_point")
                .name_property()
                .identity()
                .kind_of([ValueKind::String]),
        )
        .property(
            Property::new("device")
                .required()
                .kind_of([ValueKind::String])
                .coerce(trim_device_slash),
        )
        .property(
            Property::new("device_type")
                .coerce(coerce_symbol)
                .equal_to([
                    Value::symbol("device"),
                    Value::symbol("label"),
                    Value::symbol("uuid"),
                ])
                .default(Value::symbol("device")),
        )
        .property(
            Property::new("fstype")
                .kind_of([ValueKind::String])
                .default("auto"),
        )
        .property(
            Property::new("options")
                .coerce(coerce_comma_list)
                .kind_of([ValueKind::List])
                .default(vec!["defaults"]),
        )
        .property(Property::new("dump").kind_of([ValueKind::Integer]).default(0))
        .property(Property::new("pass").kind_of([ValueKind::Integer]).default(2))
        .property(
            Property::new("supports")
                .kind_of([ValueKind::Map])
                .default(Value::Map(supports))
                .desired_state(false),
        )
        .property(Property::new("enabled").desired_state(false))
        .property(Property::new("mounted").desired_state(false))
        .actions(["mount", "umount", "remount", "enable", "disable"])
        .build()
}

fn trim_device_slash(value: Value) -> Result<Value> {
    match value {
        Value::String(s) if s != "/" && !s.ends_with(":/") && s.ends_with('/') => {
            Ok(Value::String(s.trim_end_matches('/').to_string()))
        }
        other => Ok(other),
    }
}

/// Register the mount providers.
pub fn register(registry: &mut ProviderRegistry) -> Result<()> {
    registry.provides(
        "mount",
        PlatformPredicate::Default,
        MountOutputFlavor::NAME,
        |_| Box::new(MountProvider::<MountOutputFlavor>::new()),
    )?;
    registry.provides(
        "mount",
        PlatformPredicate::os("linux"),
        FindmntFlavor::NAME,
        |_| Box::new(MountProvider::<FindmntFlavor>::new()),
    )?;
    registry.provides(
        "mount",
        PlatformPredicate::os("solaris2"),
        SolarisFlavor::NAME,
        |_| Box::new(MountProvider::<SolarisFlavor>::new()),
    )?;
    Ok(())
}

// ============================================================================
// Desired state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Device,
    Label,
    Uuid,
}

/// The declared mount, read once from the resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub mount_point: String,
    pub device: String,
    pub device_type: DeviceType,
    pub fstype: String,
    pub options: Vec<String>,
    pub dump: i64,
    pub pass: i64,
    pub supports_remount: bool,
}

impl MountSpec {
    pub fn from_resource(resource: &Resource) -> Result<Self> {
        let device_type = match resource.get("device_type")?.as_str() {
            Some("label") => DeviceType::Label,
            Some("uuid") => DeviceType::Uuid,
            _ => DeviceType::Device,
        };
        let supports_remount = resource
            .get("supports")?
            .as_map()
            .and_then(|m| m.get("remount"))
            .is_some_and(Value::is_truthy);
        Ok(Self {
            mount_point: resource.get("mount_point")?.to_s(),
            device: resource.get("device")?.to_s(),
            device_type,
            fstype: resource.get("fstype")?.to_s(),
            options: resource.get_list("options")?,
            dump: resource.get_integer("dump")?.unwrap_or(0),
            pass: resource.get_integer("pass")?.unwrap_or(0),
            supports_remount,
        })
    }

    /// The device as written in a mount table.
    pub fn device_fstab(&self) -> String {
        match self.device_type {
            DeviceType::Device => self.device.clone(),
            DeviceType::Label => format!("LABEL={}", self.device),
            DeviceType::Uuid => format!("UUID={}", self.device),
        }
    }

    pub fn is_network_device(&self) -> bool {
        self.device.contains(':') || self.device.contains("//")
    }

    /// Whether the device must exist as a local path before mounting.
    pub fn device_should_exist(&self) -> bool {
        self.device != "none"
            && !self.is_network_device()
            && !VIRTUAL_FSTYPES.contains(&self.fstype.as_str())
    }
}

/// Names under which the mount may appear in tables and mount output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub mount_point: String,
    /// Mount point with symlinks resolved, as the kernel reports it.
    pub real_mount_point: String,
    /// Device spellings that identify this mount.
    pub devices: Vec<String>,
}

impl Target {
    pub fn matches_device(&self, device: &str) -> bool {
        let trimmed = device.trim_end_matches('/');
        self.devices
            .iter()
            .any(|d| d == device || (!trimmed.is_empty() && d.trim_end_matches('/') == trimmed))
    }
}

// ============================================================================
// Provider
// ============================================================================

/// Observed state of one mount.
#[derive(Debug, Default)]
struct Observed {
    device_real: String,
    entry: Option<TableEntry>,
    live: Option<LiveMount>,
}

/// Mount provider generic over the platform flavor.
pub struct MountProvider<F> {
    spec: Option<MountSpec>,
    target: Option<Target>,
    observed: Observed,
    current: Option<Snapshot>,
    flavor: PhantomData<F>,
}

impl<F: MountFlavor> MountProvider<F> {
    pub fn new() -> Self {
        Self {
            spec: None,
            target: None,
            observed: Observed::default(),
            current: None,
            flavor: PhantomData,
        }
    }

    fn loaded(&self) -> Result<(&MountSpec, &Target)> {
        match (&self.spec, &self.target) {
            (Some(spec), Some(target)) => Ok((spec, target)),
            _ => Err(Error::PreconditionFailed(
                "mount state was not loaded".to_string(),
            )),
        }
    }

    fn enabled(&self) -> bool {
        self.observed.entry.is_some()
    }

    fn mounted(&self) -> bool {
        self.observed.live.is_some()
    }

    fn resolve_device(ctx: &ProviderContext<'_>, spec: &MountSpec) -> Result<String> {
        if spec.device_type == DeviceType::Device {
            return Ok(spec.device.clone());
        }
        let output = ctx
            .system
            .run(&ShellCommand::new("findfs").arg(spec.device_fstab()))?;
        Ok(output
            .stdout
            .lines()
            .next()
            .map(|l| l.trim().to_string())
            .unwrap_or_default())
    }

    fn build_target(ctx: &ProviderContext<'_>, spec: &MountSpec, device_real: &str) -> Target {
        let fs = ctx.system.fs;
        let real_mount_point = fs
            .realpath(Path::new(&spec.mount_point))
            .map_or_else(|_| spec.mount_point.clone(), |p| p.display().to_string());

        let mut devices = vec![spec.device_fstab()];
        for candidate in [device_real.to_string(), spec.device.clone()] {
            if !candidate.is_empty() && !devices.contains(&candidate) {
                devices.push(candidate);
            }
        }
        if !spec.is_network_device()
            && let Ok(real) = fs.realpath(Path::new(device_real))
        {
            let real = real.display().to_string();
            if !devices.contains(&real) {
                devices.push(real);
            }
        }
        Target {
            mount_point: spec.mount_point.clone(),
            real_mount_point,
            devices,
        }
    }

    fn mount_now(&self, ctx: &ProviderContext<'_>) -> Result<()> {
        let (spec, _) = self.loaded()?;
        let command = F::mount_command(spec, &self.observed.device_real);
        ctx.system.run_checked(&command)?;
        log::debug!("{} is mounted at {}", ctx.new_resource, spec.mount_point);
        Ok(())
    }

    fn umount_now(&self, ctx: &ProviderContext<'_>) -> Result<()> {
        let (spec, _) = self.loaded()?;
        ctx.system
            .run_checked(&ShellCommand::new("umount").arg(&spec.mount_point))?;
        Ok(())
    }

    fn remove_entry(&self, ctx: &ProviderContext<'_>) -> Result<()> {
        let (_, target) = self.loaded()?;
        let path = F::table_path(ctx.config);
        let contents = ctx.system.fs.read_to_string(&path)?;
        if let Some(updated) = table::remove_last(&contents, target, F::parse_line) {
            ctx.system.fs.write_atomic(&path, &updated)?;
        }
        Ok(())
    }

    fn append_entry(&self, ctx: &ProviderContext<'_>) -> Result<()> {
        let (spec, _) = self.loaded()?;
        let path = F::table_path(ctx.config);
        let mut line = F::render_line(spec);
        line.push('\n');
        ctx.system.fs.append(&path, &line)
    }

    fn action_mount(&self, ctx: &ProviderContext<'_>, converge: &mut ConvergeActions) -> Result<()> {
        let (spec, _) = self.loaded()?;
        if self.mounted() {
            log::debug!("{} is already mounted at {}", ctx.new_resource, spec.mount_point);
            return Ok(());
        }
        converge.converge_by(
            format!("mount {} to {}", self.observed.device_real, spec.mount_point),
            || self.mount_now(ctx),
        )
    }

    fn action_umount(
        &self,
        ctx: &ProviderContext<'_>,
        converge: &mut ConvergeActions,
    ) -> Result<()> {
        let (spec, _) = self.loaded()?;
        if !self.mounted() {
            log::debug!("{} is not mounted at {}", ctx.new_resource, spec.mount_point);
            return Ok(());
        }
        converge.converge_by(format!("unmount {}", spec.mount_point), || {
            self.umount_now(ctx)
        })
    }

    fn action_remount(
        &self,
        ctx: &ProviderContext<'_>,
        converge: &mut ConvergeActions,
    ) -> Result<()> {
        let (spec, _) = self.loaded()?;
        let Some(live) = &self.observed.live else {
            log::debug!("{} is not mounted - nothing to do", ctx.new_resource);
            return Ok(());
        };
        if live.has_options(&spec.options) {
            log::debug!(
                "{} is mounted with {} already",
                ctx.new_resource,
                spec.options.join(",")
            );
            return Ok(());
        }
        if spec.supports_remount {
            converge.converge_by(format!("remount {}", spec.mount_point), || {
                ctx.system
                    .run_checked(&F::remount_command(spec))
                    .map(|_| ())
            })
        } else {
            converge.converge_by(
                format!("remount {} (umount and mount)", spec.mount_point),
                || {
                    self.umount_now(ctx)?;
                    self.mount_now(ctx)
                },
            )
        }
    }

    fn action_enable(
        &self,
        ctx: &ProviderContext<'_>,
        converge: &mut ConvergeActions,
    ) -> Result<()> {
        let (spec, _) = self.loaded()?;
        let table = F::table_path(ctx.config);
        let options = F::table_options(spec);
        match &self.observed.entry {
            Some(entry) if entry.unchanged(spec, &options, F::COMPARES_DUMP) => {
                log::debug!("{} is already enabled - nothing to do", ctx.new_resource);
                Ok(())
            }
            Some(_) => converge.converge_by(
                format!(
                    "update {} in {} to {}",
                    spec.mount_point,
                    table.display(),
                    F::render_line(spec)
                ),
                || {
                    self.remove_entry(ctx)?;
                    self.append_entry(ctx)
                },
            ),
            None => converge.converge_by(
                format!(
                    "add {} to {} as {}",
                    spec.mount_point,
                    table.display(),
                    F::render_line(spec)
                ),
                || self.append_entry(ctx),
            ),
        }
    }

    fn action_disable(
        &self,
        ctx: &ProviderContext<'_>,
        converge: &mut ConvergeActions,
    ) -> Result<()> {
        let (spec, _) = self.loaded()?;
        if !self.enabled() {
            log::debug!("{} is not enabled - nothing to do", ctx.new_resource);
            return Ok(());
        }
        converge.converge_by(
            format!(
                "remove {} from {}",
                spec.mount_point,
                F::table_path(ctx.config).display()
            ),
            || self.remove_entry(ctx),
        )
    }
}

impl<F: MountFlavor> Default for MountProvider<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: MountFlavor> Provider for MountProvider<F> {
    fn name(&self) -> &'static str {
        F::NAME
    }

    fn load_current_resource(&mut self, ctx: &ProviderContext<'_>) -> Result<()> {
        let spec = MountSpec::from_resource(ctx.new_resource)?;
        let device_real = Self::resolve_device(ctx, &spec)?;
        let target = Self::build_target(ctx, &spec, &device_real);

        let table = F::table_path(ctx.config);
        let entry = match ctx.system.fs.read_optional(&table)? {
            Some(contents) => table::find_last(&contents, &target, F::parse_line),
            None => {
                log::debug!("{} not found, treating mount as not enabled", table.display());
                None
            }
        };
        let live = F::probe(ctx, &target)?;

        let mut snapshot = Snapshot::for_resource(ctx.new_resource);
        snapshot.observe("device", spec.device.clone())?;
        if let Some(entry) = &entry {
            snapshot.observe("fstype", entry.fstype.clone())?;
            snapshot.observe("options", Value::strings(entry.options.iter().cloned()))?;
            snapshot.observe("dump", entry.dump)?;
            snapshot.observe("pass", entry.pass)?;
        }
        snapshot.observe("enabled", entry.is_some())?;
        snapshot.observe("mounted", live.is_some())?;

        self.observed = Observed {
            device_real,
            entry,
            live,
        };
        self.spec = Some(spec);
        self.target = Some(target);
        self.current = Some(snapshot);
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
        let Some(spec) = &self.spec else {
            return;
        };
        let fs = ctx.system.fs;

        F::define_requirements(spec, requirements);

        if spec.device_should_exist() {
            let device_real = self.observed.device_real.as_str();
            requirements
                .assert(Scope::actions(["mount", "remount"]))
                .assertion(move || !device_real.is_empty() && fs.exists(Path::new(device_real)))
                .failure_message(
                    ErrorKind::PreconditionFailed,
                    format!("Device {} does not exist", spec.device),
                )
                .whyrun(format!(
                    "Assuming device {} would have been created",
                    spec.device
                ));
        }
        if spec.mount_point != "none" {
            requirements
                .assert(Scope::actions(["mount", "remount"]))
                .assertion(move || fs.exists(Path::new(&spec.mount_point)))
                .failure_message(
                    ErrorKind::PreconditionFailed,
                    format!("Mount point {} does not exist", spec.mount_point),
                )
                .whyrun(format!(
                    "Assuming mount point {} would have been created",
                    spec.mount_point
                ));
        }
    }

    fn action(
        &mut self,
        action: &str,
        ctx: &ProviderContext<'_>,
        converge: &mut ConvergeActions,
    ) -> Result<()> {
        match action {
            "mount" => self.action_mount(ctx, converge),
            "umount" => self.action_umount(ctx, converge),
            "remount" => self.action_remount(ctx, converge),
            "enable" => self.action_enable(ctx, converge),
            "disable" => self.action_disable(ctx, converge),
            other => Err(unsupported_action(self.name(), ctx.new_resource, other)),
        }
    }
}

#[cfg(test)]
mod tests;
