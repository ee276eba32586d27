//! The `group` resource: a local group, its gid and its members.
//!
//! [`GroupProvider`] carries the shared action logic and the
//! [`compare_group`] diff. A [`GroupStrategy`] supplies the commands of one
//! backend (`groupadd`, `gpasswd`, `usermod`, AIX, `pw`, `dscl`).

pub mod aix;
pub mod dscl;
pub mod groupadd;
pub mod pw;

pub use aix::Aix;
pub use dscl::Dscl;
pub use groupadd::{Gpasswd, Groupadd, Usermod};
pub use pw::Pw;

use crate::database;
use convergence::property::coerce_comma_list;
use convergence::{
    ConvergeActions, Error, ErrorKind, PlatformPredicate, Property, Provider, ProviderContext,
    ProviderRegistry, Requirements, Resource, ResourceType, Result, Scope, Snapshot, Value,
    ValueKind, unsupported_action,
};
use std::marker::PhantomData;
use std::sync::Arc;

pub fn resource_type() -> Result<Arc<ResourceType>> {
    ResourceType::builder("group")
        .property(
            Property::new("group_name")
                .name_property()
                .identity()
                .kind_of([ValueKind::String]),
        )
        .property(Property::new("gid").kind_of([ValueKind::Integer, ValueKind::String]))
        .property(
            Property::new("members")
                .coerce(coerce_comma_list)
                .kind_of([ValueKind::List]),
        )
        .property(
            Property::new("excluded_members")
                .coerce(coerce_comma_list)
                .kind_of([ValueKind::List])
                .default(Vec::<String>::new())
                .desired_state(false),
        )
        .property(
            Property::new("append")
                .kind_of([ValueKind::Bool])
                .default(false)
                .desired_state(false),
        )
        .property(
            Property::new("system")
                .kind_of([ValueKind::Bool])
                .default(false)
                .desired_state(false),
        )
        .property(
            Property::new("non_unique")
                .kind_of([ValueKind::Bool])
                .default(false)
                .desired_state(false),
        )
        .actions(["create", "remove", "modify", "manage"])
        .build()
}

/// Register the group strategies. There is no default.
pub fn register(registry: &mut ProviderRegistry) -> Result<()> {
    registry.provides("group", PlatformPredicate::os("linux"), Groupadd::NAME, |_| {
        Box::new(GroupProvider::<Groupadd>::new())
    })?;
    registry.provides(
        "group",
        PlatformPredicate::families([
            "debian", "rhel", "fedora", "amazon", "suse", "arch", "gentoo",
        ]),
        Gpasswd::NAME,
        |_| Box::new(GroupProvider::<Gpasswd>::new()),
    )?;
    registry.provides(
        "group",
        PlatformPredicate::platforms(["openbsd", "netbsd", "solaris2", "smartos", "omnios"]),
        Usermod::NAME,
        |_| Box::new(GroupProvider::<Usermod>::new()),
    )?;
    registry.provides("group", PlatformPredicate::os("aix"), Aix::NAME, |_| {
        Box::new(GroupProvider::<Aix>::new())
    })?;
    registry.provides("group", PlatformPredicate::platform("freebsd"), Pw::NAME, |_| {
        Box::new(GroupProvider::<Pw>::new())
    })?;
    registry.provides("group", PlatformPredicate::os("darwin"), Dscl::NAME, |_| {
        Box::new(GroupProvider::<Dscl>::new())
    })?;
    Ok(())
}

// ============================================================================
// Desired and observed state
// ============================================================================

/// The declared group, read once from the resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    pub name: String,
    pub gid: Option<String>,
    /// `None` leaves membership alone.
    pub members: Option<Vec<String>>,
    pub excluded_members: Vec<String>,
    pub append: bool,
    pub system: bool,
    pub non_unique: bool,
}

impl GroupSpec {
    pub fn from_resource(resource: &Resource) -> Result<Self> {
        let members = match resource.get_opt("members")? {
            Some(_) => Some(resource.get_list("members")?),
            None => None,
        };
        Ok(Self {
            name: resource.get("group_name")?.to_s(),
            gid: resource.get_string("gid")?,
            members,
            excluded_members: resource.get_list("excluded_members")?,
            append: resource.get_bool("append")?,
            system: resource.get_bool("system")?,
            non_unique: resource.get_bool("non_unique")?,
        })
    }

    /// Names both listed as members and excluded.
    pub fn conflicting_members(&self) -> Vec<String> {
        self.members
            .iter()
            .flatten()
            .filter(|m| self.excluded_members.contains(m))
            .cloned()
            .collect()
    }
}

/// A group as it exists on the node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentGroup {
    pub gid: String,
    pub members: Vec<String>,
}

impl From<database::GroupEntry> for CurrentGroup {
    fn from(entry: database::GroupEntry) -> Self {
        Self {
            gid: entry.gid,
            members: entry.members,
        }
    }
}

/// How membership must change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberPlan {
    Keep,
    /// Set the whole member list in one operation.
    Replace(Vec<String>),
    /// Add and remove individual members, in order.
    Adjust {
        add: Vec<String>,
        remove: Vec<String>,
    },
}

/// Differences between the declared and the observed group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupChange {
    /// New gid, when it differs.
    pub gid: Option<String>,
    pub members: MemberPlan,
    /// Members observed before the change.
    pub current_members: Vec<String>,
    pub descriptions: Vec<String>,
}

impl GroupChange {
    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }
}

/// Compare the declared group with the observed one (`None` when missing).
pub fn compare_group(spec: &GroupSpec, current: Option<&CurrentGroup>) -> GroupChange {
    let current_gid = current.map_or("", |c| c.gid.as_str());
    let current_members = current.map(|c| c.members.clone()).unwrap_or_default();
    let mut descriptions = Vec::new();

    let gid = spec.gid.as_ref().filter(|gid| *gid != current_gid).cloned();
    if let Some(gid) = &gid {
        descriptions.push(format!("change gid {current_gid} to {gid}"));
    }

    let members = if spec.append {
        let add: Vec<String> = spec
            .members
            .iter()
            .flatten()
            .filter(|m| !current_members.contains(m))
            .cloned()
            .collect();
        let remove: Vec<String> = spec
            .excluded_members
            .iter()
            .filter(|m| current_members.contains(m))
            .cloned()
            .collect();
        if !add.is_empty() {
            descriptions.push(format!("add missing member(s): {}", add.join(", ")));
        }
        if !remove.is_empty() {
            descriptions.push(format!("remove existing member(s): {}", remove.join(", ")));
        }
        if add.is_empty() && remove.is_empty() {
            MemberPlan::Keep
        } else {
            MemberPlan::Adjust { add, remove }
        }
    } else {
        match &spec.members {
            Some(members) if !same_members(members, &current_members) => {
                descriptions.push(format!(
                    "replace group members with new list of members: {}",
                    members.join(", ")
                ));
                MemberPlan::Replace(members.clone())
            }
            _ => MemberPlan::Keep,
        }
    };

    GroupChange {
        gid,
        members,
        current_members,
        descriptions,
    }
}

fn same_members(a: &[String], b: &[String]) -> bool {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort();
    a.dedup();
    b.sort();
    b.dedup();
    a == b
}

// ============================================================================
// Strategy
// ============================================================================

/// Error for a membership operation a backend cannot perform.
pub fn members_unsupported(strategy: &str) -> Error {
    Error::UnsupportedOperation(format!(
        "setting group members directly is not supported by {strategy}"
    ))
}

/// Commands of one group backend.
pub trait GroupStrategy: 'static {
    /// Registry name.
    const NAME: &'static str;

    /// Observe the group; `None` when it does not exist.
    fn load(ctx: &ProviderContext<'_>, name: &str) -> Result<Option<CurrentGroup>> {
        let path = &ctx.config.paths.group;
        let Some(contents) = ctx.system.fs.read_optional(path)? else {
            log::debug!("{} not found", path.display());
            return Ok(None);
        };
        Ok(database::find_group(&contents, name).map(CurrentGroup::from))
    }

    /// Backend preconditions, registered after the shared ones.
    fn define_requirements<'a>(
        _ctx: &ProviderContext<'a>,
        _spec: &'a GroupSpec,
        _requirements: &mut Requirements<'a>,
    ) {
    }

    fn create_group(ctx: &ProviderContext<'_>, spec: &GroupSpec, members: &MemberPlan)
    -> Result<()>;

    fn manage_group(ctx: &ProviderContext<'_>, spec: &GroupSpec, change: &GroupChange)
    -> Result<()>;

    fn remove_group(ctx: &ProviderContext<'_>, spec: &GroupSpec) -> Result<()>;

    fn set_members(_ctx: &ProviderContext<'_>, _spec: &GroupSpec, _members: &[String]) -> Result<()> {
        Err(members_unsupported(Self::NAME))
    }

    fn add_member(_ctx: &ProviderContext<'_>, _spec: &GroupSpec, _member: &str) -> Result<()> {
        Err(members_unsupported(Self::NAME))
    }

    fn remove_member(_ctx: &ProviderContext<'_>, _spec: &GroupSpec, _member: &str) -> Result<()> {
        Err(members_unsupported(Self::NAME))
    }

    /// Apply a membership plan through the per-member primitives.
    fn converge_members(ctx: &ProviderContext<'_>, spec: &GroupSpec, plan: &MemberPlan) -> Result<()> {
        match plan {
            MemberPlan::Keep => Ok(()),
            MemberPlan::Replace(members) => {
                log::debug!(
                    "{} setting group members to: {}",
                    ctx.new_resource,
                    if members.is_empty() {
                        "none".to_string()
                    } else {
                        members.join(", ")
                    }
                );
                Self::set_members(ctx, spec, members)
            }
            MemberPlan::Adjust { add, remove } => {
                for member in add {
                    Self::add_member(ctx, spec, member)?;
                }
                for member in remove {
                    Self::remove_member(ctx, spec, member)?;
                }
                Ok(())
            }
        }
    }
}

// ============================================================================
// Provider
// ============================================================================

/// Group provider generic over the backend.
pub struct GroupProvider<S> {
    spec: Option<GroupSpec>,
    group: Option<CurrentGroup>,
    conflicts: Vec<String>,
    current: Option<Snapshot>,
    strategy: PhantomData<S>,
}

impl<S: GroupStrategy> GroupProvider<S> {
    pub fn new() -> Self {
        Self {
            spec: None,
            group: None,
            conflicts: Vec::new(),
            current: None,
            strategy: PhantomData,
        }
    }

    fn spec(&self) -> Result<&GroupSpec> {
        self.spec
            .as_ref()
            .ok_or_else(|| Error::PreconditionFailed("group state was not loaded".to_string()))
    }

    fn action_create(&self, ctx: &ProviderContext<'_>, converge: &mut ConvergeActions) -> Result<()> {
        let spec = self.spec()?;
        match &self.group {
            None => {
                let plan = compare_group(spec, None).members;
                converge.converge_by(format!("create group {}", spec.name), || {
                    S::create_group(ctx, spec, &plan)?;
                    log::info!("{} created", ctx.new_resource);
                    Ok(())
                })
            }
            Some(group) => self.alter(ctx, converge, "alter", compare_group(spec, Some(group))),
        }
    }

    fn action_remove(&self, ctx: &ProviderContext<'_>, converge: &mut ConvergeActions) -> Result<()> {
        let spec = self.spec()?;
        if self.group.is_none() {
            log::debug!("{} does not exist - nothing to do", ctx.new_resource);
            return Ok(());
        }
        converge.converge_by(format!("remove group {}", spec.name), || {
            S::remove_group(ctx, spec)?;
            log::info!("{} removed", ctx.new_resource);
            Ok(())
        })
    }

    fn action_manage(&self, ctx: &ProviderContext<'_>, converge: &mut ConvergeActions) -> Result<()> {
        let spec = self.spec()?;
        let Some(group) = &self.group else {
            log::debug!("{} does not exist - nothing to manage", ctx.new_resource);
            return Ok(());
        };
        self.alter(ctx, converge, "manage", compare_group(spec, Some(group)))
    }

    fn action_modify(&self, ctx: &ProviderContext<'_>, converge: &mut ConvergeActions) -> Result<()> {
        let spec = self.spec()?;
        self.alter(ctx, converge, "modify", compare_group(spec, self.group.as_ref()))
    }

    fn alter(
        &self,
        ctx: &ProviderContext<'_>,
        converge: &mut ConvergeActions,
        verb: &str,
        change: GroupChange,
    ) -> Result<()> {
        let spec = self.spec()?;
        if change.is_empty() {
            log::debug!("{} is up to date", ctx.new_resource);
            return Ok(());
        }
        let mut descriptions = vec![format!("{verb} group {}", spec.name)];
        descriptions.extend(change.descriptions.iter().cloned());
        converge.converge_by(descriptions, || {
            S::manage_group(ctx, spec, &change)?;
            log::info!(
                "{} {verb}: {}",
                ctx.new_resource,
                change.descriptions.join(", ")
            );
            Ok(())
        })
    }
}

impl<S: GroupStrategy> Default for GroupProvider<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: GroupStrategy> Provider for GroupProvider<S> {
    fn name(&self) -> &'static str {
        S::NAME
    }

    fn load_current_resource(&mut self, ctx: &ProviderContext<'_>) -> Result<()> {
        let spec = GroupSpec::from_resource(ctx.new_resource)?;
        let group = S::load(ctx, &spec.name)?;

        self.current = match &group {
            Some(group) => {
                let mut snapshot = Snapshot::for_resource(ctx.new_resource);
                snapshot.observe("gid", group.gid.as_str())?;
                snapshot.observe("members", Value::strings(group.members.iter().cloned()))?;
                Some(snapshot)
            }
            None => {
                log::trace!("{} group does not exist", ctx.new_resource);
                None
            }
        };
        self.conflicts = spec.conflicting_members();
        self.group = group;
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

        let exists = self.group.is_some();
        requirements
            .assert(Scope::actions(["modify"]))
            .assertion(move || exists)
            .failure_message(
                ErrorKind::PreconditionFailed,
                format!("Cannot modify {} - group does not exist!", ctx.new_resource),
            )
            .whyrun(format!(
                "Group {} does not exist. Unless it would have been created earlier in this run, this attempt to modify it would fail.",
                spec.name
            ));

        let conflicts = &self.conflicts;
        requirements
            .assert(Scope::All)
            .assertion(move || conflicts.is_empty())
            .failure_message(
                ErrorKind::PreconditionFailed,
                format!(
                    "Attempting to both add and remove users from a group: {}",
                    conflicts.join(", ")
                ),
            );

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
            other => Err(unsupported_action(self.name(), ctx.new_resource, other)),
        }
    }
}

/// Assert that each backend binary exists.
pub(crate) fn require_binaries<'a>(
    ctx: &ProviderContext<'a>,
    binaries: &'static [&'static str],
    requirements: &mut Requirements<'a>,
) {
    let fs = ctx.system.fs;
    for binary in binaries {
        requirements
            .assert(Scope::All)
            .assertion(move || fs.exists(std::path::Path::new(binary)))
            .failure_message(
                ErrorKind::MissingPrerequisite,
                format!("Could not find binary {binary} for {}", ctx.new_resource),
            )
            .whyrun(format!(
                "Assuming {binary} will have been previously installed"
            ));
    }
}
