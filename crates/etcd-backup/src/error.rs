use std::fmt;
use std::time::Duration;

use etcd_backup_client::ClientError;

/// Phase of a backup attempt, reported with every attempt error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackupPhase {
    Discovery,
    Probe,
    Version,
    Snapshot,
    Write,
    Ledger,
}

impl fmt::Display for BackupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackupPhase::Discovery => "discovery",
            BackupPhase::Probe => "probe",
            BackupPhase::Version => "version",
            BackupPhase::Snapshot => "snapshot",
            BackupPhase::Write => "write",
            BackupPhase::Ledger => "ledger",
        };
        f.write_str(name)
    }
}

/// Errors from a backup attempt.
///
/// Everything except [`BackupError::Ledger`] aborts only the current
/// attempt; the caller may retry the whole attempt later.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("list members of cluster {cluster}: {source}")]
    Discovery {
        cluster: String,
        #[source]
        source: MembershipError,
    },

    #[error("no running replicas found")]
    NoRunningReplicas,

    #[error("no reachable member")]
    NoReachableMember,

    #[error("create etcd client for {endpoint} failed: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to receive etcd version from {endpoint}: {source}")]
    Version {
        endpoint: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to receive snapshot from {endpoint}: {source}")]
    Snapshot {
        endpoint: String,
        #[source]
        source: ClientError,
    },

    #[error("snapshot transfer did not finish within {after:?}")]
    TransferTimeout { after: Duration },

    #[error("failed to write snapshot to {target}: {source}")]
    Write {
        target: String,
        #[source]
        source: SinkError,
    },

    #[error("invalid backup name: {0}")]
    Name(#[from] NameError),

    #[error("cannot determine latest backup revision: {0}")]
    Ledger(#[source] LedgerError),
}

impl BackupError {
    /// Phase that failed.
    pub fn phase(&self) -> BackupPhase {
        match self {
            BackupError::Discovery { .. } | BackupError::NoRunningReplicas => {
                BackupPhase::Discovery
            }
            BackupError::NoReachableMember | BackupError::Connect { .. } => BackupPhase::Probe,
            BackupError::Version { .. } => BackupPhase::Version,
            BackupError::Snapshot { .. } => BackupPhase::Snapshot,
            BackupError::TransferTimeout { .. }
            | BackupError::Write { .. }
            | BackupError::Name(_) => BackupPhase::Write,
            BackupError::Ledger(_) => BackupPhase::Ledger,
        }
    }

    /// Whether the process should stop serving backups.
    ///
    /// Only a ledger failure qualifies: without the latest stored revision
    /// the next backup could silently duplicate or skip state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BackupError::Ledger(_))
    }
}

/// Errors from the membership collaborator.
#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    #[error("member list unavailable: {0}")]
    Unavailable(String),
}

/// Errors from a backup sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid destination path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error(transparent)]
    Name(#[from] NameError),

    #[error("{0}")]
    Other(String),
}

/// Errors building or parsing backup names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("revision {0} does not fit the backup name format")]
    RevisionOutOfRange(i64),

    #[error("version {0:?} cannot be used in a backup name")]
    InvalidVersion(String),

    #[error("malformed backup name {0:?}")]
    Malformed(String),
}

/// Errors determining the latest stored revision.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("query latest backup: {0}")]
    Sink(#[from] SinkError),

    #[error("parse latest backup name: {0}")]
    Name(#[from] NameError),
}
