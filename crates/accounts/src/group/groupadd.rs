//! shadow-utils backends: `groupadd`/`groupmod`/`groupdel`, with members
//! managed by `gpasswd` or `usermod`.

use super::{GroupChange, GroupSpec, GroupStrategy, MemberPlan, require_binaries};
use convergence::{
    ErrorKind, ProviderContext, Requirements, Result, SYSTEM_GROUP_FAMILIES, Scope, ShellCommand,
};

const GROUPADD_BINARIES: &[&str] = &["/usr/sbin/groupadd", "/usr/sbin/groupmod", "/usr/sbin/groupdel"];

/// `groupadd [-g gid] [-o] [-r] name`
pub fn groupadd_command(ctx: &ProviderContext<'_>, spec: &GroupSpec) -> ShellCommand {
    let mut command = ShellCommand::new("groupadd");
    if let Some(gid) = &spec.gid {
        command = command.arg("-g").arg(gid);
    }
    if spec.non_unique {
        command = command.arg("-o");
    }
    if spec.system && ctx.node.is_platform_family(SYSTEM_GROUP_FAMILIES) {
        command = command.arg("-r");
    }
    command.arg(&spec.name)
}

/// `groupmod -g gid [-o] name`, or `None` when nothing would be sent.
pub fn groupmod_command(spec: &GroupSpec, change: &GroupChange) -> Option<ShellCommand> {
    let gid = change.gid.as_ref()?;
    let mut command = ShellCommand::new("groupmod").arg("-g").arg(gid);
    if spec.non_unique {
        command = command.arg("-o");
    }
    Some(command.arg(&spec.name))
}

fn groupdel(ctx: &ProviderContext<'_>, spec: &GroupSpec) -> Result<()> {
    ctx.system
        .run_checked(&ShellCommand::new("groupdel").arg(&spec.name))?;
    Ok(())
}

fn create_then_members<S: GroupStrategy>(
    ctx: &ProviderContext<'_>,
    spec: &GroupSpec,
    members: &MemberPlan,
) -> Result<()> {
    ctx.system.run_checked(&groupadd_command(ctx, spec))?;
    S::converge_members(ctx, spec, members)
}

fn modify_then_members<S: GroupStrategy>(
    ctx: &ProviderContext<'_>,
    spec: &GroupSpec,
    change: &GroupChange,
) -> Result<()> {
    if let Some(command) = groupmod_command(spec, change) {
        ctx.system.run_checked(&command)?;
    }
    S::converge_members(ctx, spec, &change.members)
}

/// Plain shadow-utils; cannot change members.
pub struct Groupadd;

impl GroupStrategy for Groupadd {
    const NAME: &'static str = "group::groupadd";

    fn define_requirements<'a>(
        ctx: &ProviderContext<'a>,
        _spec: &'a GroupSpec,
        requirements: &mut Requirements<'a>,
    ) {
        require_binaries(ctx, GROUPADD_BINARIES, requirements);
    }

    fn create_group(ctx: &ProviderContext<'_>, spec: &GroupSpec, members: &MemberPlan) -> Result<()> {
        create_then_members::<Self>(ctx, spec, members)
    }

    fn manage_group(ctx: &ProviderContext<'_>, spec: &GroupSpec, change: &GroupChange) -> Result<()> {
        modify_then_members::<Self>(ctx, spec, change)
    }

    fn remove_group(ctx: &ProviderContext<'_>, spec: &GroupSpec) -> Result<()> {
        groupdel(ctx, spec)
    }
}

/// shadow-utils with `gpasswd` for membership.
pub struct Gpasswd;

impl GroupStrategy for Gpasswd {
    const NAME: &'static str = "group::gpasswd";

    fn define_requirements<'a>(
        ctx: &ProviderContext<'a>,
        _spec: &'a GroupSpec,
        requirements: &mut Requirements<'a>,
    ) {
        require_binaries(ctx, GROUPADD_BINARIES, requirements);
        require_binaries(ctx, &["/usr/bin/gpasswd"], requirements);
    }

    fn create_group(ctx: &ProviderContext<'_>, spec: &GroupSpec, members: &MemberPlan) -> Result<()> {
        create_then_members::<Self>(ctx, spec, members)
    }

    fn manage_group(ctx: &ProviderContext<'_>, spec: &GroupSpec, change: &GroupChange) -> Result<()> {
        modify_then_members::<Self>(ctx, spec, change)
    }

    fn remove_group(ctx: &ProviderContext<'_>, spec: &GroupSpec) -> Result<()> {
        groupdel(ctx, spec)
    }

    fn set_members(ctx: &ProviderContext<'_>, spec: &GroupSpec, members: &[String]) -> Result<()> {
        let command = ShellCommand::new("gpasswd")
            .arg("-M")
            .arg(members.join(","))
            .arg(&spec.name);
        ctx.system.run_checked(&command)?;
        Ok(())
    }

    fn add_member(ctx: &ProviderContext<'_>, spec: &GroupSpec, member: &str) -> Result<()> {
        let command = ShellCommand::new("gpasswd").arg("-a").arg(member).arg(&spec.name);
        ctx.system.run_checked(&command)?;
        Ok(())
    }

    fn remove_member(ctx: &ProviderContext<'_>, spec: &GroupSpec, member: &str) -> Result<()> {
        let command = ShellCommand::new("gpasswd").arg("-d").arg(member).arg(&spec.name);
        ctx.system.run_checked(&command)?;
        Ok(())
    }
}

/// shadow-utils with `usermod -G` for membership (BSDs, Solaris family).
pub struct Usermod;

impl Usermod {
    fn usermod(ctx: &ProviderContext<'_>, spec: &GroupSpec, member: &str, append: bool) -> Result<()> {
        let mut command = ShellCommand::new("usermod");
        if append {
            command = command.arg("-a");
        }
        let command = command.arg("-G").arg(&spec.name).arg(member);
        ctx.system.run_checked(&command)?;
        Ok(())
    }
}

impl GroupStrategy for Usermod {
    const NAME: &'static str = "group::usermod";

    fn define_requirements<'a>(
        ctx: &ProviderContext<'a>,
        spec: &'a GroupSpec,
        requirements: &mut Requirements<'a>,
    ) {
        require_binaries(ctx, GROUPADD_BINARIES, requirements);
        require_binaries(ctx, &["/usr/sbin/usermod"], requirements);

        let append = spec.append;
        requirements
            .assert(Scope::actions(["modify", "manage"]))
            .assertion(move || append)
            .failure_message(
                ErrorKind::UnsupportedOperation,
                format!(
                    "setting group members directly is not supported by {}, must set append true in group",
                    Self::NAME
                ),
            )
            .whyrun(
                "Setting group members directly is not supported by this provider. Assuming append true would have been set",
            );

        let excluded = &spec.excluded_members;
        requirements
            .assert(Scope::All)
            .assertion(move || excluded.is_empty())
            .failure_message(
                ErrorKind::UnsupportedOperation,
                format!("excluded_members is not supported by {}", Self::NAME),
            );
    }

    fn create_group(ctx: &ProviderContext<'_>, spec: &GroupSpec, members: &MemberPlan) -> Result<()> {
        create_then_members::<Self>(ctx, spec, members)
    }

    fn manage_group(ctx: &ProviderContext<'_>, spec: &GroupSpec, change: &GroupChange) -> Result<()> {
        modify_then_members::<Self>(ctx, spec, change)
    }

    fn remove_group(ctx: &ProviderContext<'_>, spec: &GroupSpec) -> Result<()> {
        groupdel(ctx, spec)
    }

    fn set_members(ctx: &ProviderContext<'_>, spec: &GroupSpec, members: &[String]) -> Result<()> {
        for member in members {
            Self::usermod(ctx, spec, member, false)?;
        }
        Ok(())
    }

    fn add_member(ctx: &ProviderContext<'_>, spec: &GroupSpec, member: &str) -> Result<()> {
        Self::usermod(ctx, spec, member, true)
    }
}
