//! The shadow-utils option builder and the Linux `useradd` strategy.

use super::{Attr, CurrentUser, UserDiff, UserSpec, UserStrategy, lock_status, lock_unknown};
use convergence::{CommandOutput, Error, ProviderContext, Result, ShellCommand};
use std::path::Path;

/// Option flag per attribute, in emission order.
pub const UNIVERSAL_FLAGS: &[(Attr, &str)] = &[
    (Attr::Comment, "-c"),
    (Attr::Gid, "-g"),
    (Attr::Password, "-p"),
    (Attr::Shell, "-s"),
    (Attr::Uid, "-u"),
];

/// Flags without `-p`, for platforms that set the password separately.
pub const FLAGS_WITHOUT_PASSWORD: &[(Attr, &str)] = &[
    (Attr::Comment, "-c"),
    (Attr::Gid, "-g"),
    (Attr::Shell, "-s"),
    (Attr::Uid, "-u"),
];

/// Exit status of `usermod`/`userdel` when the home directory could not be
/// moved or removed.
const HOME_DIRECTORY_STATUS: i32 = 12;

/// Option building shared by the `useradd`/`usermod`/`userdel` platforms.
pub trait UseraddFamily {
    /// Attribute flags this platform passes to useradd and usermod.
    const FLAGS: &'static [(Attr, &'static str)] = UNIVERSAL_FLAGS;

    /// Options common to useradd and usermod, from the diff.
    fn universal_options(diff: &UserDiff<'_>) -> Vec<String> {
        let mut opts = Vec::new();
        let mut push = |attr: Attr, flag: &str| {
            if diff.should_set(attr)
                && let Some(value) = diff.spec.value(attr)
            {
                opts.push(flag.to_string());
                opts.push(value.to_string());
            }
        };
        for (attr, flag) in Self::FLAGS {
            push(*attr, flag);
        }
        if diff.linux {
            push(Attr::ExpireDate, "-e");
            push(Attr::Inactive, "-f");
        }
        if diff.updating_home()
            && let Some(home) = &diff.spec.home
        {
            opts.push("-d".to_string());
            opts.push(home.clone());
        }
        if diff.spec.non_unique {
            opts.push("-o".to_string());
        }
        opts
    }

    fn useradd_options(diff: &UserDiff<'_>) -> Vec<String> {
        let mut opts = Vec::new();
        if diff.spec.system {
            opts.push("-r".to_string());
        }
        opts.push(if diff.spec.manage_home { "-m" } else { "-M" }.to_string());
        opts
    }

    fn usermod_options(diff: &UserDiff<'_>) -> Vec<String> {
        if diff.updating_home() && diff.spec.manage_home {
            vec!["-m".to_string()]
        } else {
            Vec::new()
        }
    }

    fn useradd_command(diff: &UserDiff<'_>) -> ShellCommand {
        ShellCommand::new("useradd")
            .args(Self::universal_options(diff))
            .args(Self::useradd_options(diff))
            .arg(&diff.spec.name)
    }

    /// `None` when usermod would receive no options.
    fn usermod_command(diff: &UserDiff<'_>) -> Option<ShellCommand> {
        let mut opts = Self::universal_options(diff);
        opts.extend(Self::usermod_options(diff));
        if opts.is_empty() {
            return None;
        }
        Some(
            ShellCommand::new("usermod")
                .args(opts)
                .arg(&diff.spec.name)
                .returns([0, HOME_DIRECTORY_STATUS]),
        )
    }

    fn userdel_command(spec: &UserSpec) -> ShellCommand {
        let mut command = ShellCommand::new("userdel");
        if spec.manage_home {
            command = command.arg("-r");
        }
        if spec.force {
            command = command.arg("-f");
        }
        command.arg(&spec.name).returns([0, HOME_DIRECTORY_STATUS])
    }
}

pub(crate) fn run_useradd<F: UseraddFamily>(ctx: &ProviderContext<'_>, diff: &UserDiff<'_>) -> Result<()> {
    ctx.system.run_checked(&F::useradd_command(diff))?;
    Ok(())
}

pub(crate) fn run_usermod<F: UseraddFamily>(ctx: &ProviderContext<'_>, diff: &UserDiff<'_>) -> Result<()> {
    let Some(command) = F::usermod_command(diff) else {
        log::debug!("{} needs no usermod options", ctx.new_resource);
        return Ok(());
    };
    let output = ctx.system.run_checked(&command)?;
    if output.status == HOME_DIRECTORY_STATUS {
        let home = diff.spec.home.as_deref().unwrap_or_default();
        if !ctx.system.fs.is_dir(Path::new(home)) {
            return Err(Error::ExternalCommandFailed {
                command: command.to_string(),
                status: output.status,
                stderr: format!("Unable to modify home directory for {}", diff.spec.name),
            });
        }
    }
    Ok(())
}

pub(crate) fn run_userdel<F: UseraddFamily>(ctx: &ProviderContext<'_>, spec: &UserSpec) -> Result<()> {
    let command = F::userdel_command(spec);
    let output = ctx.system.run_checked(&command)?;
    if output.status == HOME_DIRECTORY_STATUS {
        log::warn!("{} removed but its home directory could not be", ctx.new_resource);
    }
    Ok(())
}

/// Linux shadow-utils.
pub struct Useradd;

impl Useradd {
    /// Lock state from `passwd -S` output.
    pub fn parse_status(
        ctx: &ProviderContext<'_>,
        command: &ShellCommand,
        output: &str,
    ) -> Result<bool> {
        let status = output.split_whitespace().nth(1).unwrap_or_default();
        if status.starts_with('L') {
            Ok(true)
        } else if status.starts_with('P') || status.starts_with('N') {
            Ok(false)
        } else {
            log::debug!("{} unexpected passwd -S output: {output}", ctx.new_resource);
            Err(lock_unknown(ctx, command, &CommandOutput::ok(output)))
        }
    }
}

impl UseraddFamily for Useradd {}

impl UserStrategy for Useradd {
    const NAME: &'static str = "user::useradd";

    fn create_user(ctx: &ProviderContext<'_>, diff: &UserDiff<'_>) -> Result<()> {
        run_useradd::<Self>(ctx, diff)
    }

    fn manage_user(ctx: &ProviderContext<'_>, diff: &UserDiff<'_>) -> Result<()> {
        run_usermod::<Self>(ctx, diff)
    }

    fn remove_user(ctx: &ProviderContext<'_>, spec: &UserSpec) -> Result<()> {
        run_userdel::<Self>(ctx, spec)
    }

    fn check_lock(
        ctx: &ProviderContext<'_>,
        spec: &UserSpec,
        _current: Option<&CurrentUser>,
    ) -> Result<bool> {
        let command = ShellCommand::new("passwd")
            .arg("-S")
            .arg(&spec.name)
            .returns([0, 1]);
        match lock_status(ctx, &command)? {
            Some(output) => Self::parse_status(ctx, &command, &output),
            None => Ok(false),
        }
    }

    fn lock_user(ctx: &ProviderContext<'_>, spec: &UserSpec) -> Result<()> {
        ctx.system
            .run_checked(&ShellCommand::new("usermod").arg("-L").arg(&spec.name))?;
        Ok(())
    }

    fn unlock_user(ctx: &ProviderContext<'_>, spec: &UserSpec) -> Result<()> {
        ctx.system
            .run_checked(&ShellCommand::new("usermod").arg("-U").arg(&spec.name))?;
        Ok(())
    }
}
