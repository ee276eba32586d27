//! fstab and vfstab lines.
//!
//! ```text
//! # fstab: device mount_point fstype options dump pass
//! /dev/sdb1 /mnt/data ext4 defaults,noatime 0 2
//!
//! # vfstab: device fsck_device mount_point fstype pass mount_at_boot options
//! /dev/dsk/c0t1d0s0	-	/export	ufs	2	yes	logging
//! ```

use super::{MountSpec, Target};

/// A matching table line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub device: String,
    pub fstype: String,
    pub options: Vec<String>,
    pub dump: i64,
    pub pass: i64,
}

impl TableEntry {
    /// `options` is the spec's option list as the table would read it back.
    pub fn unchanged(&self, spec: &MountSpec, options: &[String], compare_dump: bool) -> bool {
        self.device == spec.device_fstab()
            && self.fstype == spec.fstype
            && self.options == options
            && (!compare_dump || self.dump == spec.dump)
            && self.pass == spec.pass
    }
}

fn is_data_line(line: &str) -> bool {
    !(line.is_empty() || line.starts_with('#') || line.starts_with(char::is_whitespace))
}

fn split_options(field: &str) -> Vec<String> {
    field
        .split(',')
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

/// fstab option list as written and read back.
pub fn fstab_options(options: &[String]) -> Vec<String> {
    if options.is_empty() {
        vec!["defaults".to_string()]
    } else {
        options.to_vec()
    }
}

/// vfstab option list as read back: the options column, then `noauto` when
/// the mount-at-boot column says no, or `defaults` when both are empty.
pub fn vfstab_options<'a>(
    column: impl IntoIterator<Item = &'a str>,
    at_boot: bool,
) -> Vec<String> {
    let mut options: Vec<String> = column
        .into_iter()
        .filter(|o| !o.is_empty() && *o != "noauto" && *o != "defaults")
        .map(str::to_string)
        .collect();
    if !at_boot {
        options.push("noauto".to_string());
    }
    if options.is_empty() {
        options.push("defaults".to_string());
    }
    options
}

fn mounts_at_boot(options: &[String]) -> bool {
    !options.iter().any(|o| o == "noauto")
}

/// The spec's options as [`parse_vfstab_line`] would return them after
/// [`render_vfstab_line`].
pub fn vfstab_spec_options(spec: &MountSpec) -> Vec<String> {
    vfstab_options(spec.options.iter().map(String::as_str), mounts_at_boot(&spec.options))
}

pub fn parse_fstab_line(line: &str, target: &Target) -> Option<TableEntry> {
    if !is_data_line(line) {
        return None;
    }
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [device, mount_point, fstype, options, dump, pass, ..] = fields.as_slice() else {
        return None;
    };
    if *mount_point != target.mount_point || !target.matches_device(device) {
        return None;
    }
    Some(TableEntry {
        device: (*device).to_string(),
        fstype: (*fstype).to_string(),
        options: split_options(options),
        dump: dump.parse().unwrap_or(0),
        pass: pass.parse().unwrap_or(0),
    })
}

pub fn render_fstab_line(spec: &MountSpec) -> String {
    let options = if spec.options.is_empty() {
        "defaults".to_string()
    } else {
        spec.options.join(",")
    };
    format!(
        "{} {} {} {} {} {}",
        spec.device_fstab(),
        spec.mount_point,
        spec.fstype,
        options,
        spec.dump,
        spec.pass
    )
}

pub fn parse_vfstab_line(line: &str, target: &Target) -> Option<TableEntry> {
    if !is_data_line(line) {
        return None;
    }
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [device, _fsck, mount_point, fstype, pass, at_boot, rest @ ..] = fields.as_slice() else {
        return None;
    };
    if *mount_point != target.mount_point || !target.matches_device(device) {
        return None;
    }
    let column = match rest.first() {
        None | Some(&"-") => "",
        Some(field) => field,
    };
    let options = vfstab_options(column.split(','), *at_boot != "no");
    Some(TableEntry {
        device: (*device).to_string(),
        fstype: (*fstype).to_string(),
        options,
        dump: 0,
        pass: if *pass == "-" { 0 } else { pass.parse().unwrap_or(0) },
    })
}

pub fn render_vfstab_line(spec: &MountSpec) -> String {
    let at_boot = if mounts_at_boot(&spec.options) {
        "yes"
    } else {
        "no"
    };
    let options: Vec<&str> = spec
        .options
        .iter()
        .map(String::as_str)
        .filter(|o| *o != "noauto" && *o != "defaults")
        .collect();
    let options = if options.is_empty() {
        "-".to_string()
    } else {
        options.join(",")
    };
    let pass = if spec.pass == 0 {
        "-".to_string()
    } else {
        spec.pass.to_string()
    };
    format!(
        "{}\t-\t{}\t{}\t{}\t{}\t{}",
        spec.device_fstab(),
        spec.mount_point,
        spec.fstype,
        pass,
        at_boot,
        options
    )
}

/// Last matching entry of a table.
pub fn find_last(
    contents: &str,
    target: &Target,
    parse: fn(&str, &Target) -> Option<TableEntry>,
) -> Option<TableEntry> {
    contents.lines().filter_map(|l| parse(l, target)).last()
}

/// `contents` without its last matching line; `None` when nothing matched.
pub fn remove_last(
    contents: &str,
    target: &Target,
    parse: fn(&str, &Target) -> Option<TableEntry>,
) -> Option<String> {
    let lines: Vec<&str> = contents.lines().collect();
    let index = lines.iter().rposition(|l| parse(l, target).is_some())?;
    let mut out = String::with_capacity(contents.len());
    for (i, line) in lines.iter().enumerate() {
        if i != index {
            out.push_str(line);
            out.push('\n');
        }
    }
    Some(out)
}
