//! macOS Directory Service through `dscl . -<cmd> /Groups/<name> ...`.

use super::{CurrentGroup, GroupChange, GroupSpec, GroupStrategy, MemberPlan, require_binaries};
use convergence::{Error, ErrorKind, ProviderContext, Requirements, Result, ShellCommand};

/// First gid tried when none is declared.
const FIRST_FREE_GID: u32 = 200;

/// Gids tried before giving up.
const GID_SEARCH_LIMIT: u32 = 1000;

pub struct Dscl;

impl Dscl {
    fn command(args: &[&str]) -> ShellCommand {
        let mut command = ShellCommand::new("dscl").arg(".");
        if let Some((cmd, rest)) = args.split_first() {
            command = command.arg(format!("-{cmd}")).args(rest.iter().copied());
        }
        command
    }

    /// Run dscl, failing on a non-zero exit (except for `delete`) or a
    /// "No such key" answer.
    pub fn safe_dscl(ctx: &ProviderContext<'_>, args: &[&str]) -> Result<String> {
        let command = Self::command(args);
        let output = ctx.system.run(&command)?;
        if !output.success() {
            if args.first() == Some(&"delete") {
                return Ok(String::new());
            }
            return Err(Error::ExternalCommandFailed {
                command: command.to_string(),
                status: output.status,
                stderr: format!("dscl error: {}", output.stderr.trim()),
            });
        }
        if output.stdout.contains("No such key: ") {
            return Err(Error::ExternalCommandFailed {
                command: command.to_string(),
                status: output.status,
                stderr: format!("dscl error: {}", output.stdout.trim()),
            });
        }
        Ok(output.stdout)
    }

    fn path(spec: &GroupSpec) -> String {
        format!("/Groups/{}", spec.name)
    }

    fn used_gids(ctx: &ProviderContext<'_>) -> Result<Vec<u32>> {
        let listing = Self::safe_dscl(ctx, &["list", "/Groups", "gid"])?;
        Ok(listing
            .lines()
            .filter_map(|line| line.split_whitespace().nth(1))
            .filter_map(|gid| gid.parse().ok())
            .collect())
    }

    /// First unused gid at or above 200.
    pub fn free_gid(ctx: &ProviderContext<'_>, search_limit: u32) -> Result<u32> {
        let used = Self::used_gids(ctx)?;
        (FIRST_FREE_GID..FIRST_FREE_GID + search_limit)
            .find(|gid| !used.contains(gid))
            .ok_or_else(|| {
                Error::PreconditionFailed(format!(
                    "gid not found. Exhausted. Searched {search_limit} times"
                ))
            })
    }

    fn set_gid(ctx: &ProviderContext<'_>, spec: &GroupSpec, gid: Option<&str>) -> Result<()> {
        let gid = match gid.filter(|g| !g.is_empty()) {
            Some(gid) => {
                let used = Self::used_gids(ctx)?;
                if gid.parse::<u32>().is_ok_and(|g| used.contains(&g)) {
                    return Err(Error::PreconditionFailed(format!(
                        "gid is already in use: {gid}"
                    )));
                }
                gid.to_string()
            }
            None => Self::free_gid(ctx, GID_SEARCH_LIMIT)?.to_string(),
        };
        Self::safe_dscl(ctx, &["create", &Self::path(spec), "PrimaryGroupID", &gid])?;
        Ok(())
    }

    /// Parse `dscl . -read /Groups/<name>` output.
    pub fn parse_read(output: &str) -> CurrentGroup {
        let mut group = CurrentGroup::default();
        for line in output.lines() {
            if line.starts_with(char::is_whitespace) {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            match key {
                "PrimaryGroupID" => group.gid = value.trim().to_string(),
                "GroupMembership" => {
                    group.members = value.split_whitespace().map(str::to_string).collect();
                }
                _ => {}
            }
        }
        group
    }
}

impl GroupStrategy for Dscl {
    const NAME: &'static str = "group::dscl";

    fn load(ctx: &ProviderContext<'_>, name: &str) -> Result<Option<CurrentGroup>> {
        let path = format!("/Groups/{name}");
        match Self::safe_dscl(ctx, &["read", &path]) {
            Ok(output) => Ok(Some(Self::parse_read(&output))),
            Err(err) if err.kind() == ErrorKind::ExternalCommandFailed => {
                log::trace!("{path} not readable: {err}");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn define_requirements<'a>(
        ctx: &ProviderContext<'a>,
        _spec: &'a GroupSpec,
        requirements: &mut Requirements<'a>,
    ) {
        require_binaries(ctx, &["/usr/bin/dscl"], requirements);
    }

    fn create_group(ctx: &ProviderContext<'_>, spec: &GroupSpec, members: &MemberPlan) -> Result<()> {
        let path = Self::path(spec);
        Self::safe_dscl(ctx, &["create", &path])?;
        Self::safe_dscl(ctx, &["create", &path, "Password", "*"])?;
        Self::set_gid(ctx, spec, spec.gid.as_deref())?;
        Self::converge_members(ctx, spec, members)
    }

    fn manage_group(ctx: &ProviderContext<'_>, spec: &GroupSpec, change: &GroupChange) -> Result<()> {
        if let Some(gid) = &change.gid {
            Self::set_gid(ctx, spec, Some(gid))?;
        }
        Self::converge_members(ctx, spec, &change.members)
    }

    fn remove_group(ctx: &ProviderContext<'_>, spec: &GroupSpec) -> Result<()> {
        Self::safe_dscl(ctx, &["delete", &Self::path(spec)])?;
        Ok(())
    }

    fn converge_members(ctx: &ProviderContext<'_>, spec: &GroupSpec, plan: &MemberPlan) -> Result<()> {
        let path = Self::path(spec);
        let (add, remove): (&[String], &[String]) = match plan {
            MemberPlan::Keep => return Ok(()),
            MemberPlan::Replace(members) => {
                log::debug!("{} resetting group membership", ctx.new_resource);
                Self::safe_dscl(ctx, &["create", &path, "GroupMembers", ""])?;
                Self::safe_dscl(ctx, &["create", &path, "GroupMembership", ""])?;
                (members.as_slice(), &[][..])
            }
            MemberPlan::Adjust { add, remove } => (add.as_slice(), remove.as_slice()),
        };
        if !add.is_empty() {
            log::debug!("{} setting group members {}", ctx.new_resource, add.join(", "));
            let mut args = vec!["append", path.as_str(), "GroupMembership"];
            args.extend(add.iter().map(String::as_str));
            Self::safe_dscl(ctx, &args)?;
        }
        if !remove.is_empty() {
            log::debug!("{} removing group members {}", ctx.new_resource, remove.join(", "));
            let mut args = vec!["delete", path.as_str(), "GroupMembership"];
            args.extend(remove.iter().map(String::as_str));
            Self::safe_dscl(ctx, &args)?;
        }
        Ok(())
    }
}
