//! etcd backup coordination.
//!
//! Finds the cluster member with the most advanced revision, pulls a
//! point-in-time snapshot from it and hands the bytes to a sink, skipping
//! the work when nothing changed since the last stored backup.
//!
//! Layers, leaf-first:
//! - **Probe / selector**: serializable revision reads, max-revision fold
//! - **Streamer**: version query + snapshot stream on the selected member
//! - **Sink / naming / ledger**: revision-encoded artifact names, latest lookup
//! - **Coordinator**: the `save_snap` / `save_snap_with_prefix` operations
//!
//! The wire client lives in `etcd-backup-client`.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod ledger;
pub mod member;
pub mod naming;
pub mod probe;
pub mod selector;
pub mod sink;
pub mod status;
pub mod streamer;

pub use config::BackupConfig;
pub use coordinator::BackupCoordinator;
pub use error::{BackupError, BackupPhase, LedgerError, MembershipError, NameError, SinkError};
pub use ledger::latest_backup_revision;
pub use member::{ClusterMember, MemberLister, MemberPhase, Replica, StaticMembers};
pub use naming::{backup_path, make_backup_name, parse_revision, to_mb, BACKUP_SUFFIX};
pub use probe::{ReplicaProber, RevisionObservation};
pub use selector::{select_max, select_source, Selection};
pub use sink::{BackupSink, FileSink, SnapshotBytes};
pub use status::BackupStatus;
pub use streamer::SnapshotSource;

// Re-export the wire layer for callers wiring a coordinator
pub use etcd_backup_client;
