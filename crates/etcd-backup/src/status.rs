use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::naming::to_mb;

/// Metadata of a completed backup, returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupStatus {
    /// RFC 3339, UTC, second precision.
    pub creation_time: String,
    /// Whole MiB written (truncated).
    pub size: u64,
    /// Server version of the source replica.
    pub version: String,
    /// Revision backed up.
    pub revision: i64,
    /// Elapsed whole seconds + 1.
    pub time_took_in_second: u64,
}

impl BackupStatus {
    pub(crate) fn completed(version: String, revision: i64, bytes: u64, elapsed: Duration) -> Self {
        Self {
            creation_time: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            size: to_mb(bytes),
            version,
            revision,
            time_took_in_second: elapsed.as_secs() + 1,
        }
    }
}
