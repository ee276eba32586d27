//! FreeBSD `pw groupadd|groupmod|groupdel`.
//!
//! `pw` takes membership in the same command as the group record, so this
//! backend builds its member options from the plan instead of issuing
//! per-member commands.

use super::{GroupChange, GroupSpec, GroupStrategy, MemberPlan, require_binaries};
use convergence::{ProviderContext, Requirements, Result, ShellCommand};

pub struct Pw;

impl Pw {
    /// Members to add and remove for `groupmod`.
    fn member_delta(change: &GroupChange) -> (Vec<String>, Vec<String>) {
        match &change.members {
            MemberPlan::Keep => (Vec::new(), Vec::new()),
            MemberPlan::Adjust { add, remove } => (add.clone(), remove.clone()),
            MemberPlan::Replace(members) => {
                let add = members
                    .iter()
                    .filter(|m| !change.current_members.contains(m))
                    .cloned()
                    .collect();
                let remove = change
                    .current_members
                    .iter()
                    .filter(|m| !members.contains(m))
                    .cloned()
                    .collect();
                (add, remove)
            }
        }
    }
}

impl GroupStrategy for Pw {
    const NAME: &'static str = "group::pw";

    fn define_requirements<'a>(
        ctx: &ProviderContext<'a>,
        _spec: &'a GroupSpec,
        requirements: &mut Requirements<'a>,
    ) {
        require_binaries(ctx, &["/usr/sbin/pw"], requirements);
    }

    fn create_group(ctx: &ProviderContext<'_>, spec: &GroupSpec, members: &MemberPlan) -> Result<()> {
        let mut command = ShellCommand::new("pw").arg("groupadd").arg(&spec.name);
        if let Some(gid) = &spec.gid {
            command = command.arg("-g").arg(gid);
        }
        if spec.non_unique {
            command = command.arg("-o");
        }
        let initial = match members {
            MemberPlan::Replace(list) | MemberPlan::Adjust { add: list, .. } => list.as_slice(),
            MemberPlan::Keep => &[],
        };
        if !initial.is_empty() {
            command = command.arg("-M").arg(initial.join(","));
        }
        ctx.system.run_checked(&command)?;
        Ok(())
    }

    fn manage_group(ctx: &ProviderContext<'_>, spec: &GroupSpec, change: &GroupChange) -> Result<()> {
        let mut command = ShellCommand::new("pw").arg("groupmod").arg(&spec.name);
        let mut has_options = false;
        if let Some(gid) = &change.gid {
            command = command.arg("-g").arg(gid);
            has_options = true;
        }
        let (add, remove) = Self::member_delta(change);
        if !add.is_empty() {
            command = command.arg("-m").arg(add.join(","));
            has_options = true;
        }
        if !remove.is_empty() {
            command = command.arg("-d").arg(remove.join(","));
            has_options = true;
        }
        if has_options {
            ctx.system.run_checked(&command)?;
        } else {
            log::debug!("{} needs no pw groupmod options", ctx.new_resource);
        }
        Ok(())
    }

    fn remove_group(ctx: &ProviderContext<'_>, spec: &GroupSpec) -> Result<()> {
        let command = ShellCommand::new("pw").arg("groupdel").arg(&spec.name);
        ctx.system.run_checked(&command)?;
        Ok(())
    }
}
