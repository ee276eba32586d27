//! Platform flavors of the mount provider.

use super::probe::{self, LiveMount};
use super::table::{self, TableEntry};
use super::{DeviceType, MountSpec, Target};
use convergence::{
    Config, ErrorKind, ProviderContext, Requirements, Result, Scope, ShellCommand,
};
use std::path::PathBuf;

/// Table format, live probe and command syntax of one platform.
pub trait MountFlavor: 'static {
    /// Registry name.
    const NAME: &'static str;

    /// Whether the table records a dump frequency.
    const COMPARES_DUMP: bool = true;

    fn table_path(config: &Config) -> PathBuf;

    fn parse_line(line: &str, target: &Target) -> Option<TableEntry>;

    fn render_line(spec: &MountSpec) -> String;

    /// The spec's options as `parse_line` reads them back from `render_line`.
    fn table_options(spec: &MountSpec) -> Vec<String> {
        table::fstab_options(&spec.options)
    }

    /// The filesystem mounted at the target, if it is ours.
    fn probe(ctx: &ProviderContext<'_>, target: &Target) -> Result<Option<LiveMount>>;

    fn mount_command(spec: &MountSpec, device_real: &str) -> ShellCommand;

    fn remount_command(spec: &MountSpec) -> ShellCommand {
        ShellCommand::new("mount")
            .arg("-o")
            .arg(format!("remount,{}", spec.options.join(",")))
            .arg(&spec.mount_point)
    }

    /// Platform-specific preconditions.
    fn define_requirements<'a>(_spec: &'a MountSpec, _requirements: &mut Requirements<'a>) {}
}

fn fstab_mount_command(spec: &MountSpec, device_real: &str) -> ShellCommand {
    let mut command = ShellCommand::new("mount").arg("-t").arg(&spec.fstype);
    if !spec.options.is_empty() {
        command = command.arg("-o").arg(spec.options.join(","));
    }
    command = match spec.device_type {
        DeviceType::Device => command.arg(device_real),
        DeviceType::Label => command.arg("-L").arg(&spec.device),
        DeviceType::Uuid => command.arg("-U").arg(&spec.device),
    };
    command.arg(&spec.mount_point)
}

/// fstab plus `mount` output; registered for every node.
pub struct MountOutputFlavor;

impl MountFlavor for MountOutputFlavor {
    const NAME: &'static str = "mount::mount";

    fn table_path(config: &Config) -> PathBuf {
        config.paths.fstab.clone()
    }

    fn parse_line(line: &str, target: &Target) -> Option<TableEntry> {
        table::parse_fstab_line(line, target)
    }

    fn render_line(spec: &MountSpec) -> String {
        table::render_fstab_line(spec)
    }

    fn probe(ctx: &ProviderContext<'_>, target: &Target) -> Result<Option<LiveMount>> {
        let output = ctx.system.run_capture(&ShellCommand::new("mount"))?;
        probe::parse_mount_output(&output, target)
    }

    fn mount_command(spec: &MountSpec, device_real: &str) -> ShellCommand {
        fstab_mount_command(spec, device_real)
    }
}

/// fstab plus `findmnt`.
pub struct FindmntFlavor;

impl MountFlavor for FindmntFlavor {
    const NAME: &'static str = "mount::linux";

    fn table_path(config: &Config) -> PathBuf {
        config.paths.fstab.clone()
    }

    fn parse_line(line: &str, target: &Target) -> Option<TableEntry> {
        table::parse_fstab_line(line, target)
    }

    fn render_line(spec: &MountSpec) -> String {
        table::render_fstab_line(spec)
    }

    fn probe(ctx: &ProviderContext<'_>, target: &Target) -> Result<Option<LiveMount>> {
        // Exit 1 means nothing is mounted there.
        let command = ShellCommand::new("findmnt")
            .args(["-rn", "--target"])
            .arg(&target.mount_point)
            .returns([0, 1]);
        let output = ctx.system.run_capture(&command)?;
        Ok(probe::parse_findmnt(&output, target))
    }

    fn mount_command(spec: &MountSpec, device_real: &str) -> ShellCommand {
        fstab_mount_command(spec, device_real)
    }
}

/// vfstab plus `mount -v`.
pub struct SolarisFlavor;

impl MountFlavor for SolarisFlavor {
    const NAME: &'static str = "mount::solaris";
    const COMPARES_DUMP: bool = false;

    fn table_path(config: &Config) -> PathBuf {
        config.paths.vfstab.clone()
    }

    fn parse_line(line: &str, target: &Target) -> Option<TableEntry> {
        table::parse_vfstab_line(line, target)
    }

    fn render_line(spec: &MountSpec) -> String {
        table::render_vfstab_line(spec)
    }

    fn table_options(spec: &MountSpec) -> Vec<String> {
        table::vfstab_spec_options(spec)
    }

    fn probe(ctx: &ProviderContext<'_>, target: &Target) -> Result<Option<LiveMount>> {
        let output = ctx.system.run_capture(&ShellCommand::new("mount").arg("-v"))?;
        probe::parse_mount_output(&output, target)
    }

    fn mount_command(spec: &MountSpec, device_real: &str) -> ShellCommand {
        let options: Vec<&str> = spec
            .options
            .iter()
            .map(String::as_str)
            .filter(|o| *o != "noauto" && *o != "defaults")
            .collect();
        let mut command = ShellCommand::new("mount").arg("-F").arg(&spec.fstype);
        if !options.is_empty() {
            command = command.arg("-o").arg(options.join(","));
        }
        command.arg(device_real).arg(&spec.mount_point)
    }

    fn define_requirements<'a>(spec: &'a MountSpec, requirements: &mut Requirements<'a>) {
        let device_type = spec.device_type;
        requirements
            .assert(Scope::All)
            .assertion(move || device_type == DeviceType::Device)
            .failure_message(
                ErrorKind::UnsupportedOperation,
                "Mount resource can only be of device_type device on Solaris",
            );
    }
}
