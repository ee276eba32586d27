//! AIX: `mkgroup`, `chgroup`, `chgrpmem`, `rmgroup`.

use super::{GroupChange, GroupSpec, GroupStrategy, MemberPlan, require_binaries};
use convergence::{ProviderContext, Requirements, Result, ShellCommand};

pub struct Aix;

impl Aix {
    fn chgrpmem(ctx: &ProviderContext<'_>, spec: &GroupSpec, mode: &str, members: &str) -> Result<()> {
        let command = ShellCommand::new("chgrpmem")
            .args(["-m", mode])
            .arg(members)
            .arg(&spec.name);
        ctx.system.run_checked(&command)?;
        Ok(())
    }
}

impl GroupStrategy for Aix {
    const NAME: &'static str = "group::aix";

    fn define_requirements<'a>(
        ctx: &ProviderContext<'a>,
        _spec: &'a GroupSpec,
        requirements: &mut Requirements<'a>,
    ) {
        require_binaries(
            ctx,
            &["/usr/bin/mkgroup", "/usr/bin/chgroup", "/usr/sbin/rmgroup"],
            requirements,
        );
    }

    fn create_group(ctx: &ProviderContext<'_>, spec: &GroupSpec, members: &MemberPlan) -> Result<()> {
        let mut command = ShellCommand::new("mkgroup");
        if let Some(gid) = &spec.gid {
            command = command.arg(format!("id={gid}"));
        }
        ctx.system.run_checked(&command.arg(&spec.name))?;
        Self::converge_members(ctx, spec, members)
    }

    fn manage_group(ctx: &ProviderContext<'_>, spec: &GroupSpec, change: &GroupChange) -> Result<()> {
        if let Some(gid) = &change.gid {
            let command = ShellCommand::new("chgroup")
                .arg(format!("id={gid}"))
                .arg(&spec.name);
            ctx.system.run_checked(&command)?;
        }
        Self::converge_members(ctx, spec, &change.members)
    }

    fn remove_group(ctx: &ProviderContext<'_>, spec: &GroupSpec) -> Result<()> {
        ctx.system
            .run_checked(&ShellCommand::new("rmgroup").arg(&spec.name))?;
        Ok(())
    }

    fn set_members(ctx: &ProviderContext<'_>, spec: &GroupSpec, members: &[String]) -> Result<()> {
        Self::chgrpmem(ctx, spec, "=", &members.join(","))
    }

    fn add_member(ctx: &ProviderContext<'_>, spec: &GroupSpec, member: &str) -> Result<()> {
        Self::chgrpmem(ctx, spec, "+", member)
    }

    fn remove_member(ctx: &ProviderContext<'_>, spec: &GroupSpec, member: &str) -> Result<()> {
        Self::chgrpmem(ctx, spec, "-", member)
    }
}
