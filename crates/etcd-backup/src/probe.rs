//! Replica prober: learns one member's current revision.
//!
//! Uses a serializable read so that an overloaded or minority-partitioned
//! member still answers from local state without a consensus round-trip.
//! Failures are soft: they come back as an observation, never as an error.

use std::sync::Arc;
use std::time::Duration;

use etcd_backup_client::{ClientError, Connector, TlsConfig};

use crate::member::Replica;

/// Result of probing one replica.
#[derive(Debug)]
pub struct RevisionObservation {
    pub replica: Replica,
    pub outcome: Result<i64, ClientError>,
}

impl RevisionObservation {
    /// Observed revision, if the probe succeeded.
    pub fn revision(&self) -> Option<i64> {
        self.outcome.as_ref().ok().copied()
    }
}

/// Probes replicas one at a time.
#[derive(Clone)]
pub struct ReplicaProber {
    connector: Arc<dyn Connector>,
    tls: Option<TlsConfig>,
    dial_timeout: Duration,
    request_timeout: Duration,
}

impl ReplicaProber {
    pub fn new(
        connector: Arc<dyn Connector>,
        tls: Option<TlsConfig>,
        dial_timeout: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            connector,
            tls,
            dial_timeout,
            request_timeout,
        }
    }

    /// Probe one replica. The probe connection is closed before returning.
    pub async fn probe(&self, replica: &Replica) -> RevisionObservation {
        let outcome = self.read_revision(replica).await;
        match &outcome {
            Ok(revision) => {
                tracing::info!(member = %replica.name, revision, "member revision");
            }
            Err(e) => {
                tracing::warn!(
                    member = %replica.name,
                    endpoint = %replica.client_url(),
                    error = %e,
                    "failed to get revision from member"
                );
            }
        }
        RevisionObservation {
            replica: replica.clone(),
            outcome,
        }
    }

    /// Probe every replica sequentially, in list order.
    pub async fn probe_all(&self, replicas: &[Replica]) -> Vec<RevisionObservation> {
        let mut observations = Vec::with_capacity(replicas.len());
        for replica in replicas {
            observations.push(self.probe(replica).await);
        }
        observations
    }

    /// Connect and read, bounded by `dial_timeout + request_timeout` even if
    /// the connector or client ignores its own deadlines.
    async fn read_revision(&self, replica: &Replica) -> Result<i64, ClientError> {
        let budget = self.dial_timeout + self.request_timeout;
        tokio::time::timeout(budget, self.connect_and_read(replica))
            .await
            .map_err(|_| ClientError::Timeout {
                endpoint: replica.client_url().to_string(),
                operation: "range",
                after: budget,
            })?
    }

    async fn connect_and_read(&self, replica: &Replica) -> Result<i64, ClientError> {
        let client = self
            .connector
            .connect(replica.client_url(), self.tls.as_ref(), self.dial_timeout)
            .await?;
        client.serializable_revision(self.request_timeout).await
    }
}
