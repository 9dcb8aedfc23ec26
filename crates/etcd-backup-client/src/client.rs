use std::time::Duration;

use tokio::io::AsyncRead;

use crate::{ClientError, TlsConfig};

/// Read-once snapshot byte stream. Dropping it closes the underlying stream.
pub type SnapshotReader = Box<dyn AsyncRead + Send + Unpin>;

/// Subset of an etcd member's status response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberStatus {
    /// Server version string, e.g. `3.1.8`.
    pub version: String,
    /// Revision in the status response header.
    pub revision: i64,
}

/// Client handle bound to a single etcd endpoint.
///
/// In production: [`GatewayClient`](crate::GatewayClient) (HTTP/JSON gateway).
/// In tests: fakes that count opens and closes.
///
/// Dropping the handle releases the connection.
#[async_trait::async_trait]
pub trait KvClient: Send + Sync {
    /// The endpoint this handle is bound to.
    fn endpoint(&self) -> &str;

    /// Serializable (local, non-consensus) read of the probe key.
    /// Returns the revision in the response header.
    async fn serializable_revision(&self, timeout: Duration) -> Result<i64, ClientError>;

    /// Status query against this endpoint.
    async fn status(&self, timeout: Duration) -> Result<MemberStatus, ClientError>;

    /// Open a full-keyspace snapshot stream.
    ///
    /// `open_timeout` bounds only the open call. Reading the returned
    /// stream has no per-chunk deadline.
    async fn snapshot(&self, open_timeout: Duration) -> Result<SnapshotReader, ClientError>;
}

/// Connection factory: builds a [`KvClient`] for one endpoint.
///
/// No retries at this layer; the first failure is returned.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        endpoint: &str,
        tls: Option<&TlsConfig>,
        dial_timeout: Duration,
    ) -> Result<Box<dyn KvClient>, ClientError>;
}
