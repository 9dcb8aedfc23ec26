//! Snapshot streamer: the selected source and its open connection.
//!
//! A [`SnapshotSource`] owns the client bound to the selected replica.
//! Dropping it closes that connection, so every exit path of an attempt
//! releases it.

use std::future::Future;
use std::time::Duration;

use etcd_backup_client::{ClientError, Connector, KvClient, SnapshotReader, TlsConfig};

use crate::error::BackupError;
use crate::selector::Selection;

/// Selected replica, its observed revision and an open client.
pub struct SnapshotSource {
    selection: Selection,
    client: Box<dyn KvClient>,
}

impl SnapshotSource {
    /// Connect to the selected replica.
    pub async fn connect(
        connector: &dyn Connector,
        selection: Selection,
        tls: Option<&TlsConfig>,
        dial_timeout: Duration,
    ) -> Result<Self, BackupError> {
        let endpoint = selection.replica.client_url();
        let connect = connector.connect(endpoint, tls, dial_timeout);
        let connected = tokio::time::timeout(dial_timeout, connect)
            .await
            .unwrap_or_else(|_| {
                Err(ClientError::DialTimeout {
                    endpoint: endpoint.to_string(),
                    after: dial_timeout,
                })
            });
        let client = connected.map_err(|source| BackupError::Connect {
            endpoint: endpoint.to_string(),
            source,
        })?;
        Ok(Self { selection, client })
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn revision(&self) -> i64 {
        self.selection.revision
    }

    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }

    /// Server version of the source. Required for naming the backup.
    pub async fn version(&self, timeout: Duration) -> Result<String, BackupError> {
        bounded(timeout, "status", self.endpoint(), self.client.status(timeout))
            .await
            .map(|status| status.version)
            .map_err(|source| BackupError::Version {
                endpoint: self.endpoint().to_string(),
                source,
            })
    }

    /// Open the full-keyspace snapshot stream.
    ///
    /// `open_timeout` bounds the open call only; reading is unbounded here.
    pub async fn open_snapshot(&self, open_timeout: Duration) -> Result<SnapshotReader, BackupError> {
        bounded(open_timeout, "snapshot", self.endpoint(), self.client.snapshot(open_timeout))
            .await
            .map_err(|source| BackupError::Snapshot {
                endpoint: self.endpoint().to_string(),
                source,
            })
    }
}

/// Enforce `timeout` on a client call regardless of the client honouring it.
async fn bounded<T>(
    timeout: Duration,
    operation: &'static str,
    endpoint: &str,
    call: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, ClientError> {
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| ClientError::Timeout {
            endpoint: endpoint.to_string(),
            operation,
            after: timeout,
        })?
}
