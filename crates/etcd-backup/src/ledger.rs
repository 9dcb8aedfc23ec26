//! Revision ledger: what is already backed up.

use crate::error::{BackupError, LedgerError};
use crate::naming::parse_revision;
use crate::sink::BackupSink;

/// Revision of the latest stored backup, 0 when nothing is stored yet.
///
/// Failures map to [`BackupError::Ledger`], the one fatal error.
pub async fn latest_backup_revision(sink: &dyn BackupSink) -> Result<i64, BackupError> {
    let name = sink
        .latest()
        .await
        .map_err(|e| BackupError::Ledger(LedgerError::Sink(e)))?;

    match name.as_deref() {
        None | Some("") => Ok(0),
        Some(name) => parse_revision(name).map_err(|e| BackupError::Ledger(LedgerError::Name(e))),
    }
}
