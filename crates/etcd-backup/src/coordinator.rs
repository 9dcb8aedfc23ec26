//! BackupCoordinator: one backup attempt per call.
//!
//! Attempt flow: discover running members → probe revisions → select the
//! most advanced member → fetch its version → open a snapshot → stream it
//! into the sink. Each call starts from scratch and owns its connections
//! and streams; all of them are dropped before the call returns.
//!
//! Calls are not meant to overlap on one coordinator: callers doing
//! periodic backups run one attempt to completion before starting the next.

use std::sync::Arc;
use std::time::Instant;

use etcd_backup_client::{Connector, TlsConfig};

use crate::config::BackupConfig;
use crate::error::{BackupError, SinkError};
use crate::ledger;
use crate::member::{MemberLister, Replica};
use crate::naming::{backup_path, make_backup_name};
use crate::probe::ReplicaProber;
use crate::selector::select_source;
use crate::sink::BackupSink;
use crate::status::BackupStatus;
use crate::streamer::SnapshotSource;

/// Backs up one etcd cluster.
pub struct BackupCoordinator {
    cluster_name: String,
    namespace: String,
    members: Arc<dyn MemberLister>,
    connector: Arc<dyn Connector>,
    sink: Arc<dyn BackupSink>,
    tls: Option<TlsConfig>,
    config: BackupConfig,
}

impl BackupCoordinator {
    /// Create a coordinator with default config and no TLS.
    pub fn new(
        cluster_name: impl Into<String>,
        namespace: impl Into<String>,
        members: Arc<dyn MemberLister>,
        connector: Arc<dyn Connector>,
        sink: Arc<dyn BackupSink>,
    ) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            namespace: namespace.into(),
            members,
            connector,
            sink,
            tls: None,
            config: BackupConfig::default(),
        }
    }

    /// Use TLS for every member connection (endpoints become `https`).
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn with_config(mut self, config: BackupConfig) -> Self {
        self.config = config;
        self
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    // ── Operations ───────────────────────────────────────────────────────

    /// Save a snapshot if the cluster moved past `last_revision`.
    ///
    /// Returns `Ok(None)` when the most advanced member is not newer; no
    /// snapshot stream is opened in that case.
    pub async fn save_snap(&self, last_revision: i64) -> Result<Option<BackupStatus>, BackupError> {
        let source = self.source_with_max_revision().await?;

        if source.revision() <= last_revision {
            tracing::info!(
                revision = source.revision(),
                last_revision,
                "skipped creating new backup: no change since last time"
            );
            return Ok(None);
        }

        let status = self.write_snap(&source).await?;
        tracing::info!(
            revision = status.revision,
            version = %status.version,
            cluster = %self.cluster_name,
            "saved backup"
        );
        Ok(Some(status))
    }

    /// Save a snapshot at `prefix/<version>_<revision>_etcd.backup`,
    /// unconditionally. Returns the full path.
    ///
    /// e.g. prefix `etcd-backups/v1/default/example` gives
    /// `etcd-backups/v1/default/example/3.1.8_0000000000000001_etcd.backup`.
    pub async fn save_snap_with_prefix(&self, prefix: &str) -> Result<String, BackupError> {
        let source = self.source_with_max_revision().await?;

        let version = source.version(self.config.snapshot_timeout).await?;
        let full_path = backup_path(prefix, &make_backup_name(&version, source.revision())?);

        let mut snapshot = source.open_snapshot(self.config.snapshot_timeout).await?;
        self.persist(&full_path, self.sink.write(&full_path, &mut *snapshot))
            .await?;

        tracing::info!(path = %full_path, cluster = %self.cluster_name, "saved backup");
        Ok(full_path)
    }

    /// Revision of the latest stored backup (0 if none).
    ///
    /// An error here is fatal (see [`BackupError::is_fatal`]).
    pub async fn latest_backup_revision(&self) -> Result<i64, BackupError> {
        ledger::latest_backup_revision(self.sink.as_ref()).await
    }

    // ── Internal ─────────────────────────────────────────────────────────

    async fn write_snap(&self, source: &SnapshotSource) -> Result<BackupStatus, BackupError> {
        let start = Instant::now();
        let revision = source.revision();

        let version = source.version(self.config.snapshot_timeout).await?;
        let name = make_backup_name(&version, revision)?;

        let mut snapshot = source.open_snapshot(self.config.snapshot_timeout).await?;
        let written = self
            .persist(&name, self.sink.save(&version, revision, &mut *snapshot))
            .await?;

        Ok(BackupStatus::completed(version, revision, written, start.elapsed()))
    }

    /// Drive a sink write under the transfer ceiling.
    async fn persist<F>(&self, target: &str, write: F) -> Result<u64, BackupError>
    where
        F: std::future::Future<Output = Result<u64, SinkError>>,
    {
        let limit = self.config.max_transfer_time;
        match tokio::time::timeout(limit, write).await {
            Ok(Ok(written)) => Ok(written),
            Ok(Err(source)) => Err(BackupError::Write {
                target: target.to_string(),
                source,
            }),
            Err(_) => Err(BackupError::TransferTimeout { after: limit }),
        }
    }

    async fn running_replicas(&self) -> Result<Vec<Replica>, BackupError> {
        let members = self
            .members
            .list_members(&self.cluster_name, &self.namespace)
            .await
            .map_err(|source| BackupError::Discovery {
                cluster: self.cluster_name.clone(),
                source,
            })?;

        let secure = self.tls.is_some();
        Ok(members
            .iter()
            .filter(|m| m.is_running())
            .map(|m| Replica::from_member(m, secure, self.config.client_port))
            .collect())
    }

    /// Select the member with the highest revision and connect to it.
    async fn source_with_max_revision(&self) -> Result<SnapshotSource, BackupError> {
        let replicas = self.running_replicas().await?;
        tracing::debug!(
            cluster = %self.cluster_name,
            candidates = replicas.len(),
            "probing members"
        );

        let prober = ReplicaProber::new(
            self.connector.clone(),
            self.tls.clone(),
            self.config.dial_timeout,
            self.config.request_timeout,
        );
        let selection = select_source(&prober, &replicas).await?;

        SnapshotSource::connect(
            self.connector.as_ref(),
            selection,
            self.tls.as_ref(),
            self.config.dial_timeout,
        )
        .await
    }
}
