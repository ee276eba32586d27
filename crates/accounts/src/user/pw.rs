//! FreeBSD `pw useradd|usermod|userdel|lock|unlock`.

use super::{Attr, CurrentUser, UserDiff, UserSpec, UserStrategy, load_passwd, read_protected};
use crate::database;
use crate::group::require_binaries;
use convergence::{ProviderContext, Requirements, Result, ShellCommand};

/// Prefix `pw lock` puts in front of the hash.
const LOCKED_PREFIX: &str = "*LOCKED*";

pub struct Pw;

impl Pw {
    /// Options after the user name, shared by `useradd` and `usermod`.
    pub fn set_options(diff: &UserDiff<'_>) -> Vec<String> {
        let mut opts = Vec::new();
        let mut push = |flag: &str, value: &str| {
            opts.push(flag.to_string());
            opts.push(value.to_string());
        };
        if diff.should_set(Attr::Comment)
            && let Some(comment) = &diff.spec.comment
        {
            push("-c", comment.as_str());
        }
        if diff.updating_home()
            && let Some(home) = &diff.spec.home
        {
            push("-d", home.as_str());
        }
        for (attr, flag) in [(Attr::Gid, "-g"), (Attr::Shell, "-s"), (Attr::Uid, "-u")] {
            if diff.should_set(attr)
                && let Some(value) = diff.spec.value(attr)
            {
                push(flag, value);
            }
        }
        if diff.spec.non_unique {
            opts.push("-o".to_string());
        }
        if diff.spec.manage_home {
            opts.push("-m".to_string());
        }
        opts
    }

    fn run_pw(ctx: &ProviderContext<'_>, subcommand: &str, diff: &UserDiff<'_>) -> Result<()> {
        let command = ShellCommand::new("pw")
            .arg(subcommand)
            .arg(&diff.spec.name)
            .args(Self::set_options(diff));
        ctx.system.run_checked(&command)?;
        Self::modify_password(ctx, diff)
    }

    fn modify_password(ctx: &ProviderContext<'_>, diff: &UserDiff<'_>) -> Result<()> {
        let Some(password) = diff.spec.password.as_deref() else {
            return Ok(());
        };
        if !diff.should_set(Attr::Password) {
            log::trace!("{} no change needed to password", ctx.new_resource);
            return Ok(());
        }
        log::trace!("{} updating password", ctx.new_resource);
        let command = ShellCommand::new("pw")
            .arg("usermod")
            .arg(&diff.spec.name)
            .args(["-H", "0"])
            .stdin(password);
        ctx.system.run_checked(&command)?;
        Ok(())
    }
}

impl UserStrategy for Pw {
    const NAME: &'static str = "user::pw";

    /// The hash lives in `master.passwd`.
    fn load(ctx: &ProviderContext<'_>, name: &str) -> Result<Option<CurrentUser>> {
        let Some(mut user) = load_passwd(ctx, name)? else {
            return Ok(None);
        };
        if let Some(master) = read_protected(ctx, &ctx.config.paths.master_passwd)? {
            user.password = database::find_hash(&master, name).filter(|hash| !hash.is_empty());
        }
        Ok(Some(user))
    }

    fn define_requirements<'a>(
        ctx: &ProviderContext<'a>,
        _spec: &'a UserSpec,
        requirements: &mut Requirements<'a>,
    ) {
        require_binaries(ctx, &["/usr/sbin/pw"], requirements);
    }

    fn create_user(ctx: &ProviderContext<'_>, diff: &UserDiff<'_>) -> Result<()> {
        Self::run_pw(ctx, "useradd", diff)
    }

    fn manage_user(ctx: &ProviderContext<'_>, diff: &UserDiff<'_>) -> Result<()> {
        Self::run_pw(ctx, "usermod", diff)
    }

    fn remove_user(ctx: &ProviderContext<'_>, spec: &UserSpec) -> Result<()> {
        let mut command = ShellCommand::new("pw").arg("userdel").arg(&spec.name);
        if spec.manage_home {
            command = command.arg("-r");
        }
        ctx.system.run_checked(&command)?;
        Ok(())
    }

    fn check_lock(
        _ctx: &ProviderContext<'_>,
        _spec: &UserSpec,
        current: Option<&CurrentUser>,
    ) -> Result<bool> {
        Ok(current
            .and_then(|user| user.password.as_deref())
            .is_some_and(|hash| hash.starts_with(LOCKED_PREFIX)))
    }

    fn lock_user(ctx: &ProviderContext<'_>, spec: &UserSpec) -> Result<()> {
        ctx.system
            .run_checked(&ShellCommand::new("pw").arg("lock").arg(&spec.name))?;
        Ok(())
    }

    fn unlock_user(ctx: &ProviderContext<'_>, spec: &UserSpec) -> Result<()> {
        ctx.system
            .run_checked(&ShellCommand::new("pw").arg("unlock").arg(&spec.name))?;
        Ok(())
    }
}
