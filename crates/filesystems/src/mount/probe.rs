//! Live mount detection from `mount`, `mount -v` and `findmnt` output.

use super::Target;
use convergence::{Error, Result};
use regex::Regex;

/// A filesystem currently mounted at the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveMount {
    pub device: String,
    pub options: Vec<String>,
}

/// Options that only mean something in a mount table.
const TABLE_ONLY_OPTIONS: &[&str] = &[
    "defaults", "auto", "noauto", "nofail", "_netdev", "user", "nouser", "users",
];

impl LiveMount {
    /// Whether every desired option is already in effect.
    pub fn has_options(&self, desired: &[String]) -> bool {
        desired
            .iter()
            .filter(|o| !TABLE_ONLY_OPTIONS.contains(&o.as_str()))
            .all(|o| self.options.contains(o))
    }
}

/// Parse `mount` (Linux, BSD) or `mount -v` (Solaris) output.
///
/// Lines look like `<device> on <mount point> type <fstype> (<opts>)` or, on
/// Solaris, `<device> on <mount point> type <fstype> <opt/opt/...> on <date>`.
/// The last line for the mount point wins; it counts only when its device is
/// one of the target's devices.
pub fn parse_mount_output(output: &str, target: &Target) -> Result<Option<LiveMount>> {
    let pattern = format!(
        r"^(\S+)\s+on\s+{}\s+(?:type\s+\S+\s+)?(.*)$",
        regex::escape(&target.real_mount_point)
    );
    let re = Regex::new(&pattern)
        .map_err(|e| Error::Configuration(format!("invalid mount pattern: {e}")))?;

    let mut live = None;
    for line in output.lines() {
        let Some(caps) = re.captures(line) else {
            continue;
        };
        let device = &caps[1];
        live = if target.matches_device(device) {
            Some(LiveMount {
                device: device.to_string(),
                options: parse_option_field(&caps[2]),
            })
        } else {
            log::trace!("{device} is mounted at {}", target.real_mount_point);
            None
        };
    }
    Ok(live)
}

fn parse_option_field(rest: &str) -> Vec<String> {
    let rest = rest.trim();
    if let Some(inner) = rest.strip_prefix('(') {
        let inner = inner.split(')').next().unwrap_or_default();
        return inner.split(',').map(str::to_string).collect();
    }
    rest.split_whitespace()
        .next()
        .map(|field| field.split('/').map(str::to_string).collect())
        .unwrap_or_default()
}

/// Parse `findmnt -rn --target <mp>` output: `TARGET SOURCE FSTYPE OPTIONS`.
///
/// `--target` reports the filesystem containing the path, so the target
/// column must equal the mount point itself.
pub fn parse_findmnt(output: &str, target: &Target) -> Option<LiveMount> {
    let mut live = None;
    for line in output.lines() {
        let fields: Vec<String> = line.split_whitespace().map(unescape).collect();
        let [mount_point, source, _fstype, options, ..] = fields.as_slice() else {
            continue;
        };
        if *mount_point != target.real_mount_point {
            continue;
        }
        let device = source.split('[').next().unwrap_or(source);
        live = target.matches_device(device).then(|| LiveMount {
            device: device.to_string(),
            options: options.split(',').map(str::to_string).collect(),
        });
    }
    live
}

/// Undo findmnt raw-mode `\xNN` escapes. Escapes are per byte, so
/// multibyte characters are reassembled before decoding.
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let escaped = (bytes[i] == b'\\' && bytes.get(i + 1) == Some(&b'x'))
            .then(|| field.get(i + 2..i + 4))
            .flatten()
            .and_then(|h| u8::from_str_radix(h, 16).ok());
        match escaped {
            Some(byte) => {
                out.push(byte);
                i += 4;
            }
            None => {
                out.push(bytes[i]);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
