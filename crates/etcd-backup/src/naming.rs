//! Backup artifact naming.
//!
//! Names look like `3.1.8_0000000000000009_etcd.backup`. The revision is
//! zero-padded to a fixed width so that, for one server version,
//! lexicographic order of names equals numeric order of revisions and the
//! latest backup is simply the greatest name.

use crate::error::NameError;

/// Suffix shared by every backup artifact.
pub const BACKUP_SUFFIX: &str = "etcd.backup";

/// Digits used for the revision field.
pub const REVISION_WIDTH: usize = 16;

/// Largest revision that fits [`REVISION_WIDTH`] digits.
pub const MAX_REVISION: i64 = 9_999_999_999_999_999;

/// Build `<version>_<revision:016>_etcd.backup`.
pub fn make_backup_name(version: &str, revision: i64) -> Result<String, NameError> {
    if version.is_empty() || version.contains('/') {
        return Err(NameError::InvalidVersion(version.to_string()));
    }
    if !(0..=MAX_REVISION).contains(&revision) {
        return Err(NameError::RevisionOutOfRange(revision));
    }
    Ok(format!(
        "{version}_{revision:0width$}_{BACKUP_SUFFIX}",
        width = REVISION_WIDTH
    ))
}

/// Join a caller prefix and a backup name: `prefix/name`.
///
/// The result is cleaned the way a slash-separated path join cleans:
/// repeated slashes collapse, `.` segments drop, `..` removes the segment
/// before it, and a leading `/` is kept. An empty prefix yields the bare
/// name.
pub fn backup_path(prefix: &str, name: &str) -> String {
    let rooted = prefix.starts_with('/') || (prefix.is_empty() && name.starts_with('/'));
    let mut segments: Vec<&str> = Vec::new();
    for segment in prefix.split('/').chain(name.split('/')) {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                // `..` above the root stays at the root
                _ if rooted => {}
                _ => segments.push(".."),
            },
            s => segments.push(s),
        }
    }

    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Extract the revision from a backup name or path.
pub fn parse_revision(name: &str) -> Result<i64, NameError> {
    let malformed = || NameError::Malformed(name.to_string());

    let base = name.rsplit('/').next().unwrap_or(name);
    let stem = base
        .strip_suffix(BACKUP_SUFFIX)
        .and_then(|s| s.strip_suffix('_'))
        .ok_or_else(malformed)?;
    let (version, digits) = stem.rsplit_once('_').ok_or_else(malformed)?;
    if version.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    digits.parse().map_err(|_| malformed())
}

/// Bytes to whole mebibytes (integer division, truncates).
pub fn to_mb(bytes: u64) -> u64 {
    bytes / (1024 * 1024)
}
