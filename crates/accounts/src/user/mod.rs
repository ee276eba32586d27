//! The `user` resource: a local account, its password and its lock state.
//!
//! [`UserProvider`] owns the action logic and [`compare_user`]. Each
//! [`UserStrategy`] issues the commands of one platform. The shadow-utils
//! style strategies share their option building through
//! [`UseraddFamily`].

pub mod aix;
pub mod pw;
pub mod solaris;
pub mod useradd;

pub use aix::Aix;
pub use pw::Pw;
pub use solaris::Solaris;
pub use useradd::{UseraddFamily, Useradd};

use crate::database;
use convergence::{
    CommandOutput, ConvergeActions, Error, ErrorKind, PlatformPredicate, Property, Provider,
    ProviderContext, ProviderRegistry, Requirements, Resource, ResourceType, Result, Scope,
    ShellCommand, Snapshot, ValueKind, unsupported_action,
};
use regex::Regex;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

pub fn resource_type() -> Result<Arc<ResourceType>> {
    let date = Regex::new(r"^\d{4}-\d{2}-\d{2}$")
        .map_err(|e| Error::Configuration(format!("invalid expire_date pattern: {e}")))?;

    ResourceType::builder("user")
        .property(
            Property::new("username")
                .name_property()
                .identity()
                .kind_of([ValueKind::String]),
        )
        .property(Property::new("comment").kind_of([ValueKind::String]))
        .property(Property::new("uid").kind_of([ValueKind::Integer, ValueKind::String]))
        .property(Property::new("gid").kind_of([ValueKind::Integer, ValueKind::String]))
        .property(Property::new("home").kind_of([ValueKind::String]))
        .property(Property::new("shell").kind_of([ValueKind::String]))
        .property(
            Property::new("password")
                .kind_of([ValueKind::String])
                .sensitive(),
        )
        .property(flag("manage_home"))
        .property(flag("non_unique"))
        .property(flag("system"))
        .property(flag("force"))
        .property(
            Property::new("expire_date")
                .kind_of([ValueKind::String])
                .regex([date]),
        )
        .property(Property::new("inactive").kind_of([ValueKind::Integer]))
        .actions(["create", "remove", "modify", "manage", "lock", "unlock"])
        .build()
}

fn flag(name: &str) -> Property {
    Property::new(name)
        .kind_of([ValueKind::Bool])
        .default(false)
        .desired_state(false)
}

/// Register the user strategies. There is no default.
pub fn register(registry: &mut ProviderRegistry) -> Result<()> {
    registry.provides("user", PlatformPredicate::os("linux"), Useradd::NAME, |_| {
        Box::new(UserProvider::<Useradd>::new())
    })?;
    registry.provides("user", PlatformPredicate::os("solaris2"), Solaris::NAME, |_| {
        Box::new(UserProvider::<Solaris>::new())
    })?;
    registry.provides("user", PlatformPredicate::os("aix"), Aix::NAME, |_| {
        Box::new(UserProvider::<Aix>::new())
    })?;
    registry.provides("user", PlatformPredicate::platform("freebsd"), Pw::NAME, |_| {
        Box::new(UserProvider::<Pw>::new())
    })?;
    Ok(())
}

// ============================================================================
// Desired and observed state
// ============================================================================

/// Account attributes that can differ between declaration and node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attr {
    Comment,
    Gid,
    Password,
    Shell,
    Uid,
    Home,
    ExpireDate,
    Inactive,
}

impl Attr {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Gid => "gid",
            Self::Password => "password",
            Self::Shell => "shell",
            Self::Uid => "uid",
            Self::Home => "home",
            Self::ExpireDate => "expire_date",
            Self::Inactive => "inactive",
        }
    }
}

/// The declared account, read once from the resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSpec {
    pub name: String,
    pub comment: Option<String>,
    pub uid: Option<String>,
    /// Group name or number, as declared.
    pub gid: Option<String>,
    pub home: Option<String>,
    pub shell: Option<String>,
    pub password: Option<String>,
    pub expire_date: Option<String>,
    pub inactive: Option<String>,
    pub manage_home: bool,
    pub non_unique: bool,
    pub system: bool,
    pub force: bool,
}

impl UserSpec {
    pub fn from_resource(resource: &Resource) -> Result<Self> {
        Ok(Self {
            name: resource.get("username")?.to_s(),
            comment: resource.get_string("comment")?,
            uid: resource.get_string("uid")?,
            gid: resource.get_string("gid")?,
            home: resource.get_string("home")?,
            shell: resource.get_string("shell")?,
            password: resource.get_string("password")?,
            expire_date: resource.get_string("expire_date")?,
            inactive: resource.get_string("inactive")?,
            manage_home: resource.get_bool("manage_home")?,
            non_unique: resource.get_bool("non_unique")?,
            system: resource.get_bool("system")?,
            force: resource.get_bool("force")?,
        })
    }

    pub fn value(&self, attr: Attr) -> Option<&str> {
        match attr {
            Attr::Comment => self.comment.as_deref(),
            Attr::Gid => self.gid.as_deref(),
            Attr::Password => self.password.as_deref(),
            Attr::Shell => self.shell.as_deref(),
            Attr::Uid => self.uid.as_deref(),
            Attr::Home => self.home.as_deref(),
            Attr::ExpireDate => self.expire_date.as_deref(),
            Attr::Inactive => self.inactive.as_deref(),
        }
    }
}

/// An account as it exists on the node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentUser {
    pub uid: String,
    pub gid: String,
    pub comment: String,
    pub home: String,
    pub shell: String,
    /// Hash, when a readable database holds one.
    pub password: Option<String>,
    pub expire_date: Option<String>,
    pub inactive: Option<i64>,
}

impl CurrentUser {
    pub fn value(&self, attr: Attr) -> Option<String> {
        match attr {
            Attr::Comment => Some(self.comment.clone()),
            Attr::Gid => Some(self.gid.clone()),
            Attr::Password => self.password.clone(),
            Attr::Shell => Some(self.shell.clone()),
            Attr::Uid => Some(self.uid.clone()),
            Attr::Home => Some(self.home.clone()),
            Attr::ExpireDate => self.expire_date.clone(),
            Attr::Inactive => self.inactive.map(|days| days.to_string()),
        }
    }
}

impl From<database::PasswdEntry> for CurrentUser {
    fn from(entry: database::PasswdEntry) -> Self {
        let password = match entry.password.as_str() {
            "" | "x" | "*" => None,
            _ => Some(entry.password),
        };
        Self {
            uid: entry.uid,
            gid: entry.gid,
            comment: entry.gecos,
            home: entry.home,
            shell: entry.shell,
            password,
            expire_date: None,
            inactive: None,
        }
    }
}

/// Lexically normalize a path: `.` segments, repeated and trailing `/` go
/// away and `..` folds into its parent.
pub fn clean_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(last) if *last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Declared account against observed account.
#[derive(Debug, Clone, Copy)]
pub struct UserDiff<'a> {
    pub spec: &'a UserSpec,
    /// `None` when the account does not exist.
    pub current: Option<&'a CurrentUser>,
    /// Numeric gid the declared group resolved to.
    pub desired_gid: Option<&'a str>,
    /// Whether shadow dates are managed.
    pub linux: bool,
}

impl UserDiff<'_> {
    fn desired(&self, attr: Attr) -> Option<&str> {
        match attr {
            Attr::Gid => self.desired_gid.or_else(|| self.spec.value(Attr::Gid)),
            other => self.spec.value(other),
        }
    }

    fn observed(&self, attr: Attr) -> String {
        self.current
            .and_then(|user| user.value(attr))
            .unwrap_or_default()
    }

    /// Whether `attr` is declared and differs, compared as strings.
    pub fn should_set(&self, attr: Attr) -> bool {
        self.desired(attr)
            .is_some_and(|desired| desired != self.observed(attr))
    }

    /// Whether the declared home differs after normalization.
    pub fn updating_home(&self) -> bool {
        let Some(home) = self.spec.home.as_deref() else {
            return false;
        };
        self.current
            .is_none_or(|user| clean_path(&user.home) != clean_path(home))
    }
}

/// Describe every difference, in the order they are reported.
pub fn compare_user(diff: &UserDiff<'_>) -> Vec<String> {
    let mut changes = Vec::new();
    if diff.updating_home() {
        changes.push(format!(
            "change homedir from {} to {}",
            diff.observed(Attr::Home),
            diff.spec.home.as_deref().unwrap_or_default()
        ));
    }

    let mut attrs = vec![Attr::Comment, Attr::Shell, Attr::Password, Attr::Uid, Attr::Gid];
    if diff.linux {
        attrs.extend([Attr::ExpireDate, Attr::Inactive]);
    }
    for attr in attrs {
        if !diff.should_set(attr) {
            continue;
        }
        if attr == Attr::Password {
            changes.push("change password from ******** to ********".to_string());
        } else {
            changes.push(format!(
                "change {} from {} to {}",
                attr.name(),
                diff.observed(attr),
                diff.desired(attr).unwrap_or_default()
            ));
        }
    }
    changes
}

// ============================================================================
// Strategy
// ============================================================================

/// Commands of one user backend.
pub trait UserStrategy: 'static {
    /// Registry name.
    const NAME: &'static str;

    /// Observe the account; `None` when it does not exist.
    fn load(ctx: &ProviderContext<'_>, name: &str) -> Result<Option<CurrentUser>> {
        let Some(mut user) = load_passwd(ctx, name)? else {
            return Ok(None);
        };
        if let Some(shadow) = read_protected(ctx, &ctx.config.paths.shadow)?
            && let Some(entry) = database::find_shadow(&shadow, name)
        {
            user.password = Some(entry.hash).filter(|hash| !hash.is_empty());
            user.inactive = entry.inactive;
            user.expire_date = entry.expire_date;
        }
        Ok(Some(user))
    }

    /// Backend preconditions, registered after the shared ones.
    fn define_requirements<'a>(
        _ctx: &ProviderContext<'a>,
        _spec: &'a UserSpec,
        _requirements: &mut Requirements<'a>,
    ) {
    }

    fn create_user(ctx: &ProviderContext<'_>, diff: &UserDiff<'_>) -> Result<()>;

    fn manage_user(ctx: &ProviderContext<'_>, diff: &UserDiff<'_>) -> Result<()>;

    fn remove_user(ctx: &ProviderContext<'_>, spec: &UserSpec) -> Result<()>;

    /// Whether the account is locked.
    fn check_lock(
        ctx: &ProviderContext<'_>,
        spec: &UserSpec,
        current: Option<&CurrentUser>,
    ) -> Result<bool>;

    fn lock_user(ctx: &ProviderContext<'_>, spec: &UserSpec) -> Result<()>;

    fn unlock_user(ctx: &ProviderContext<'_>, spec: &UserSpec) -> Result<()>;
}

/// The passwd entry of `name`.
pub fn load_passwd(ctx: &ProviderContext<'_>, name: &str) -> Result<Option<CurrentUser>> {
    let path = &ctx.config.paths.passwd;
    let Some(contents) = ctx.system.fs.read_optional(path)? else {
        log::debug!("{} not found", path.display());
        return Ok(None);
    };
    Ok(database::find_passwd(&contents, name).map(CurrentUser::from))
}

/// Read a root-only database, treating an unreadable file as absent.
pub fn read_protected(ctx: &ProviderContext<'_>, path: &Path) -> Result<Option<String>> {
    match ctx.system.fs.read_optional(path) {
        Ok(contents) => Ok(contents),
        Err(err) if err.kind() == ErrorKind::Io => {
            log::debug!("{} is not readable, skipping: {err}", path.display());
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Stdout of a lock status query.
///
/// A user the query reports as missing is tolerated in why-run mode only
/// and yields `None`.
pub fn lock_status(ctx: &ProviderContext<'_>, command: &ShellCommand) -> Result<Option<String>> {
    let output = ctx.system.run(command)?;
    if ctx.why_run && output.stdout.trim().is_empty() && output.stderr.contains("does not exist") {
        log::debug!("{} does not exist yet, assuming unlocked", ctx.new_resource);
        return Ok(None);
    }
    if output.stdout.trim().is_empty() || !command.accepts(output.status) {
        return Err(lock_unknown(ctx, command, &output));
    }
    Ok(Some(output.stdout))
}

pub(crate) fn lock_unknown(
    ctx: &ProviderContext<'_>,
    command: &ShellCommand,
    output: &CommandOutput,
) -> Error {
    Error::ExternalCommandFailed {
        command: command.to_string(),
        status: output.status,
        stderr: format!("Cannot determine if {} is locked!", ctx.new_resource),
    }
}

// ============================================================================
// Provider
// ============================================================================

/// User provider generic over the backend.
pub struct UserProvider<S> {
    spec: Option<UserSpec>,
    user: Option<CurrentUser>,
    desired_gid: Option<String>,
    gid_resolved: bool,
    current: Option<Snapshot>,
    strategy: PhantomData<S>,
}

impl<S: UserStrategy> UserProvider<S> {
    pub fn new() -> Self {
        Self {
            spec: None,
            user: None,
            desired_gid: None,
            gid_resolved: true,
            current: None,
            strategy: PhantomData,
        }
    }

    fn spec(&self) -> Result<&UserSpec> {
        self.spec
            .as_ref()
            .ok_or_else(|| Error::PreconditionFailed("user state was not loaded".to_string()))
    }

    fn diff(&self, ctx: &ProviderContext<'_>) -> Result<UserDiff<'_>> {
        Ok(UserDiff {
            spec: self.spec()?,
            current: self.user.as_ref(),
            desired_gid: self.desired_gid.as_deref(),
            linux: ctx.node.is_os(&["linux"]),
        })
    }

    fn action_create(&self, ctx: &ProviderContext<'_>, converge: &mut ConvergeActions) -> Result<()> {
        let diff = self.diff(ctx)?;
        if diff.current.is_some() {
            return Self::alter(ctx, converge, "alter", &diff);
        }
        converge.converge_by(format!("create user {}", diff.spec.name), || {
            S::create_user(ctx, &diff)?;
            log::info!("{} created", ctx.new_resource);
            Ok(())
        })
    }

    fn action_remove(&self, ctx: &ProviderContext<'_>, converge: &mut ConvergeActions) -> Result<()> {
        let spec = self.spec()?;
        if self.user.is_none() {
            log::debug!("{} does not exist - nothing to do", ctx.new_resource);
            return Ok(());
        }
        converge.converge_by(format!("remove user {}", spec.name), || {
            S::remove_user(ctx, spec)?;
            log::info!("{} removed", ctx.new_resource);
            Ok(())
        })
    }

    fn action_manage(&self, ctx: &ProviderContext<'_>, converge: &mut ConvergeActions) -> Result<()> {
        let diff = self.diff(ctx)?;
        if diff.current.is_none() {
            log::debug!("{} does not exist - nothing to manage", ctx.new_resource);
            return Ok(());
        }
        Self::alter(ctx, converge, "manage", &diff)
    }

    fn action_modify(&self, ctx: &ProviderContext<'_>, converge: &mut ConvergeActions) -> Result<()> {
        let diff = self.diff(ctx)?;
        Self::alter(ctx, converge, "modify", &diff)
    }

    fn alter(
        ctx: &ProviderContext<'_>,
        converge: &mut ConvergeActions,
        verb: &str,
        diff: &UserDiff<'_>,
    ) -> Result<()> {
        let changes = compare_user(diff);
        if changes.is_empty() {
            log::debug!("{} is up to date", ctx.new_resource);
            return Ok(());
        }
        let mut descriptions = vec![format!("{verb} user {}", diff.spec.name)];
        descriptions.extend(changes.iter().cloned());
        converge.converge_by(descriptions, || {
            S::manage_user(ctx, diff)?;
            log::info!("{} {verb}: {}", ctx.new_resource, changes.join(", "));
            Ok(())
        })
    }

    fn action_lock(&self, ctx: &ProviderContext<'_>, converge: &mut ConvergeActions) -> Result<()> {
        let spec = self.spec()?;
        if S::check_lock(ctx, spec, self.user.as_ref())? {
            log::debug!("{} already locked - nothing to do", ctx.new_resource);
            return Ok(());
        }
        converge.converge_by(format!("lock the user {}", spec.name), || {
            S::lock_user(ctx, spec)?;
            log::info!("{} locked", ctx.new_resource);
            Ok(())
        })
    }

    fn action_unlock(&self, ctx: &ProviderContext<'_>, converge: &mut ConvergeActions) -> Result<()> {
        let spec = self.spec()?;
        if !S::check_lock(ctx, spec, self.user.as_ref())? {
            log::debug!("{} already unlocked - nothing to do", ctx.new_resource);
            return Ok(());
        }
        converge.converge_by(format!("unlock user {}", spec.name), || {
            S::unlock_user(ctx, spec)?;
            log::info!("{} unlocked", ctx.new_resource);
            Ok(())
        })
    }
}

impl<S: UserStrategy> Default for UserProvider<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: UserStrategy> Provider for UserProvider<S> {
    fn name(&self) -> &'static str {
        S::NAME
    }

    fn load_current_resource(&mut self, ctx: &ProviderContext<'_>) -> Result<()> {
        let spec = UserSpec::from_resource(ctx.new_resource)?;
        let user = S::load(ctx, &spec.name)?;

        let (desired_gid, gid_resolved) = match &spec.gid {
            None => (None, true),
            Some(gid) => {
                let groups = ctx
                    .system
                    .fs
                    .read_optional(&ctx.config.paths.group)?
                    .unwrap_or_default();
                let resolved = database::resolve_gid(&groups, gid);
                if resolved.is_none() {
                    log::debug!("{} group {gid} does not resolve to a gid", ctx.new_resource);
                }
                let found = resolved.is_some();
                (resolved, found)
            }
        };

        self.current = match &user {
            Some(user) => {
                let mut snapshot = Snapshot::for_resource(ctx.new_resource);
                snapshot.observe("uid", user.uid.as_str())?;
                snapshot.observe("gid", user.gid.as_str())?;
                snapshot.observe("comment", user.comment.as_str())?;
                snapshot.observe("home", user.home.as_str())?;
                snapshot.observe("shell", user.shell.as_str())?;
                snapshot.observe("password", user.password.clone())?;
                snapshot.observe("expire_date", user.expire_date.clone())?;
                snapshot.observe("inactive", user.inactive)?;
                Some(snapshot)
            }
            None => {
                log::trace!("{} user does not exist", ctx.new_resource);
                None
            }
        };
        self.desired_gid = desired_gid;
        self.gid_resolved = gid_resolved;
        self.user = user;
        self.spec = Some(spec);
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

        let gid_resolved = self.gid_resolved;
        let group = spec.gid.as_deref().unwrap_or_default();
        requirements
            .assert(Scope::actions(["create", "modify", "manage", "lock", "unlock"]))
            .assertion(move || gid_resolved)
            .failure_message(
                ErrorKind::PreconditionFailed,
                format!("Couldn't lookup integer GID for group name {group}"),
            )
            .whyrun(format!(
                "group name {group} does not exist.  This will cause group assignment to fail.  Assuming this group will have been created previously."
            ));

        let linux = ctx.node.is_os(&["linux"]);
        let shadow_dates = spec.expire_date.is_some() || spec.inactive.is_some();
        requirements
            .assert(Scope::All)
            .assertion(move || linux || !shadow_dates)
            .failure_message(
                ErrorKind::UnsupportedOperation,
                "Properties expire_date and inactive are not supported by this OS or have not been implemented for this OS yet.",
            )
            .whyrun(
                "Properties expire_date and inactive are ignored as they are not supported by this OS or have not been implemented yet for this OS",
            );

        let exists = self.user.is_some();
        requirements
            .assert(Scope::actions(["modify", "lock", "unlock"]))
            .assertion(move || exists)
            .failure_message(
                ErrorKind::PreconditionFailed,
                format!("Cannot modify user {} - does not exist!", spec.name),
            )
            .whyrun(format!("Assuming user {} would have been created", spec.name));

        S::define_requirements(ctx, spec, requirements);
    }

    fn action(
        &mut self,
        action: &str,
        ctx: &ProviderContext<'_>,
        converge: &mut ConvergeActions,
    ) -> Result<()> {
        match action {
            "create" => self.action_create(ctx, converge),
            "remove" => self.action_remove(ctx, converge),
            "manage" => self.action_manage(ctx, converge),
            "modify" => self.action_modify(ctx, converge),
            "lock" => self.action_lock(ctx, converge),
            "unlock" => self.action_unlock(ctx, converge),
            other => Err(unsupported_action(self.name(), ctx.new_resource, other)),
        }
    }
}

#[cfg(test)]
mod tests;
