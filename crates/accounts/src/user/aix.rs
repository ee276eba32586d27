//! AIX: `useradd`/`usermod` without `-p`, passwords through `chpasswd -e`
//! and lock state through `lsuser`/`chuser`.

use super::useradd::{FLAGS_WITHOUT_PASSWORD, run_useradd, run_userdel, run_usermod};
use super::{
    Attr, CurrentUser, UseraddFamily, UserDiff, UserSpec, UserStrategy, lock_status, lock_unknown,
};
use convergence::{CommandOutput, ProviderContext, Result, ShellCommand};

pub struct Aix;

impl Aix {
    fn manage_password(ctx: &ProviderContext<'_>, diff: &UserDiff<'_>) -> Result<()> {
        if !diff.should_set(Attr::Password) {
            return Ok(());
        }
        let Some(hash) = diff.spec.password.as_deref() else {
            return Ok(());
        };
        log::debug!("{} setting password", ctx.new_resource);
        let command = ShellCommand::new("chpasswd")
            .arg("-e")
            .stdin(format!("{}:{hash}", diff.spec.name));
        ctx.system.run_checked(&command)?;
        Ok(())
    }

    fn chuser(ctx: &ProviderContext<'_>, spec: &UserSpec, locked: bool) -> Result<()> {
        let command = ShellCommand::new("chuser")
            .arg(format!("account_locked={locked}"))
            .arg(&spec.name);
        ctx.system.run_checked(&command)?;
        Ok(())
    }
}

impl UseraddFamily for Aix {
    const FLAGS: &'static [(Attr, &'static str)] = FLAGS_WITHOUT_PASSWORD;

    /// AIX useradd has no `-M`.
    fn useradd_options(diff: &UserDiff<'_>) -> Vec<String> {
        let mut opts = Vec::new();
        if diff.spec.system {
            opts.push("-r".to_string());
        }
        if diff.spec.manage_home {
            opts.push("-m".to_string());
        }
        opts
    }

    /// AIX usermod cannot move a home directory.
    fn usermod_options(_diff: &UserDiff<'_>) -> Vec<String> {
        Vec::new()
    }
}

impl UserStrategy for Aix {
    const NAME: &'static str = "user::aix";

    fn create_user(ctx: &ProviderContext<'_>, diff: &UserDiff<'_>) -> Result<()> {
        run_useradd::<Self>(ctx, diff)?;
        Self::manage_password(ctx, diff)
    }

    fn manage_user(ctx: &ProviderContext<'_>, diff: &UserDiff<'_>) -> Result<()> {
        run_usermod::<Self>(ctx, diff)?;
        Self::manage_password(ctx, diff)
    }

    fn remove_user(ctx: &ProviderContext<'_>, spec: &UserSpec) -> Result<()> {
        run_userdel::<Self>(ctx, spec)
    }

    fn check_lock(
        ctx: &ProviderContext<'_>,
        spec: &UserSpec,
        _current: Option<&CurrentUser>,
    ) -> Result<bool> {
        let command = ShellCommand::new("lsuser")
            .args(["-a", "account_locked"])
            .arg(&spec.name);
        let Some(output) = lock_status(ctx, &command)? else {
            return Ok(false);
        };
        let value = output
            .split_whitespace()
            .find_map(|field| field.strip_prefix("account_locked="));
        match value {
            Some(value) => Ok(value == "true"),
            None => Err(lock_unknown(ctx, &command, &CommandOutput::ok(output.as_str()))),
        }
    }

    fn lock_user(ctx: &ProviderContext<'_>, spec: &UserSpec) -> Result<()> {
        Self::chuser(ctx, spec, true)
    }

    fn unlock_user(ctx: &ProviderContext<'_>, spec: &UserSpec) -> Result<()> {
        Self::chuser(ctx, spec, false)
    }
}
