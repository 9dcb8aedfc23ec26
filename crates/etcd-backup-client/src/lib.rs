//! etcd backup wire layer.
//!
//! Builds single-endpoint client handles to etcd members and exposes the
//! three maintenance calls the backup engine needs: a serializable range
//! read (for the header revision), a status query (for the server version)
//! and a snapshot stream.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use etcd_backup_client::{Connector, GatewayConnector, KvClient};
//!
//! # async fn example() -> Result<(), etcd_backup_client::ClientError> {
//! let connector = GatewayConnector::new();
//! let client = connector
//!     .connect("http://example-0001.example.default.svc:2379", None, Duration::from_secs(5))
//!     .await?;
//!
//! let rev = client.serializable_revision(Duration::from_secs(5)).await?;
//! let status = client.status(Duration::from_secs(60)).await?;
//! println!("{} is at revision {rev} running etcd {}", client.endpoint(), status.version);
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod gateway;
mod snapshot;
mod tls;
mod wire;

pub use client::{Connector, KvClient, MemberStatus, SnapshotReader};
pub use error::ClientError;
pub use gateway::{GatewayClient, GatewayConnector, DEFAULT_API_PREFIX};
pub use snapshot::decode_snapshot_stream;
pub use tls::TlsConfig;

/// Key read by the revision probe. Only the response header matters.
pub const PROBE_KEY: &[u8] = b"/";
