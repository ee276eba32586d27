//! Solaris and illumos: shadow-utils without `-p`.
//!
//! `useradd` cannot take a hash there, so the password is written straight
//! into the shadow file.

use super::useradd::{FLAGS_WITHOUT_PASSWORD, run_useradd, run_userdel, run_usermod};
use super::{Attr, CurrentUser, UseraddFamily, UserDiff, UserSpec, UserStrategy, lock_status};
use crate::database;
use convergence::{Error, ProviderContext, Result, ShellCommand};

const SECONDS_PER_DAY: i64 = 86_400;

pub struct Solaris;

impl Solaris {
    /// Days since the epoch, as the shadow last-change field counts them.
    pub fn today() -> i64 {
        chrono::Utc::now().timestamp().div_euclid(SECONDS_PER_DAY)
    }

    fn manage_password(ctx: &ProviderContext<'_>, diff: &UserDiff<'_>) -> Result<()> {
        if !diff.should_set(Attr::Password) {
            log::trace!("{} no change needed to password", ctx.new_resource);
            return Ok(());
        }
        let Some(hash) = diff.spec.password.as_deref() else {
            return Ok(());
        };
        let path = &ctx.config.paths.shadow;
        let contents = ctx.system.fs.read_to_string(path)?;
        let updated = database::replace_shadow_hash(&contents, &diff.spec.name, hash, Self::today())
            .ok_or_else(|| {
                Error::PreconditionFailed(format!(
                    "User {} does not have an entry in {}",
                    diff.spec.name,
                    path.display()
                ))
            })?;
        log::debug!("{} updating password in {}", ctx.new_resource, path.display());
        ctx.system.fs.write_atomic(path, &updated)
    }
}

impl UseraddFamily for Solaris {
    const FLAGS: &'static [(Attr, &'static str)] = FLAGS_WITHOUT_PASSWORD;
}

impl UserStrategy for Solaris {
    const NAME: &'static str = "user::solaris";

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
        let command = ShellCommand::new("passwd").arg("-s").arg(&spec.name);
        Ok(lock_status(ctx, &command)?
            .is_some_and(|output| output.split_whitespace().nth(1) == Some("LK")))
    }

    fn lock_user(ctx: &ProviderContext<'_>, spec: &UserSpec) -> Result<()> {
        ctx.system
            .run_checked(&ShellCommand::new("passwd").arg("-l").arg(&spec.name))?;
        Ok(())
    }

    fn unlock_user(ctx: &ProviderContext<'_>, spec: &UserSpec) -> Result<()> {
        ctx.system
            .run_checked(&ShellCommand::new("passwd").arg("-u").arg(&spec.name))?;
        Ok(())
    }
}
