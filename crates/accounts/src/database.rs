//! Readers for the colon-separated account databases: `/etc/group`,
//! `/etc/passwd`, `/etc/shadow` and `/etc/master.passwd`.
//!
//! Lookups scan every line and keep the first entry for a name, the way
//! `getgrnam(3)` and `getpwnam(3)` do. Comment and blank lines are skipped.

use chrono::{Days, NaiveDate};

/// One `/etc/group` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub name: String,
    pub gid: String,
    pub members: Vec<String>,
}

/// One `/etc/passwd` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswdEntry {
    pub name: String,
    pub password: String,
    pub uid: String,
    pub gid: String,
    pub gecos: String,
    pub home: String,
    pub shell: String,
}

/// The fields of a `/etc/shadow` entry the user resource compares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowEntry {
    pub name: String,
    pub hash: String,
    pub inactive: Option<i64>,
    /// Account expiry as `YYYY-MM-DD`.
    pub expire_date: Option<String>,
}

fn records(contents: &str) -> impl Iterator<Item = Vec<&str>> {
    contents
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.split(':').collect())
}

fn split_members(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn find_group(contents: &str, name: &str) -> Option<GroupEntry> {
    records(contents).find_map(|fields| match fields.as_slice() {
        [n, _, gid, rest @ ..] if *n == name => Some(GroupEntry {
            name: (*n).to_string(),
            gid: (*gid).to_string(),
            members: rest.first().map(|m| split_members(m)).unwrap_or_default(),
        }),
        _ => None,
    })
}

/// The gid for a group name, or the input itself when it is numeric.
pub fn resolve_gid(contents: &str, group: &str) -> Option<String> {
    if group.parse::<u32>().is_ok() {
        return Some(group.to_string());
    }
    find_group(contents, group).map(|g| g.gid)
}

pub fn find_passwd(contents: &str, name: &str) -> Option<PasswdEntry> {
    records(contents).find_map(|fields| match fields.as_slice() {
        [n, password, uid, gid, gecos, home, shell, ..] if *n == name => Some(PasswdEntry {
            name: (*n).to_string(),
            password: (*password).to_string(),
            uid: (*uid).to_string(),
            gid: (*gid).to_string(),
            gecos: (*gecos).to_string(),
            home: (*home).to_string(),
            shell: (*shell).to_string(),
        }),
        _ => None,
    })
}

/// The password hash field (second column) for `name`.
///
/// Shared by `/etc/shadow` and BSD `master.passwd`.
pub fn find_hash(contents: &str, name: &str) -> Option<String> {
    records(contents).find_map(|fields| match fields.as_slice() {
        [n, hash, ..] if *n == name => Some((*hash).to_string()),
        _ => None,
    })
}

pub fn find_shadow(contents: &str, name: &str) -> Option<ShadowEntry> {
    records(contents).find_map(|fields| {
        if fields.first() != Some(&name) {
            return None;
        }
        let number = |i: usize| fields.get(i).and_then(|f| f.parse::<i64>().ok());
        Some(ShadowEntry {
            name: name.to_string(),
            hash: fields.get(1).map(|h| (*h).to_string()).unwrap_or_default(),
            inactive: number(6),
            expire_date: number(7).and_then(days_to_date),
        })
    })
}

/// Days since the epoch, as shadow stores them, to `YYYY-MM-DD`.
pub fn days_to_date(days: i64) -> Option<String> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    let date = epoch.checked_add_days(Days::new(u64::try_from(days).ok()?))?;
    Some(date.format("%Y-%m-%d").to_string())
}

/// Rewrite the hash and last-change day of `name` in a shadow file.
///
/// Returns `None` when the user has no entry.
pub fn replace_shadow_hash(
    contents: &str,
    name: &str,
    hash: &str,
    last_change: i64,
) -> Option<String> {
    let mut found = false;
    let mut out = String::with_capacity(contents.len() + hash.len());
    for line in contents.lines() {
        let mut fields: Vec<String> = line.split(':').map(str::to_string).collect();
        if !found && fields.len() > 2 && fields[0] == name {
            found = true;
            fields[1] = hash.to_string();
            fields[2] = last_change.to_string();
            out.push_str(&fields.join(":"));
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    found.then_some(out)
}
