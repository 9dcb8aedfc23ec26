//! Cluster membership input and replica addressing.
//!
//! The orchestrator (or a static list) reports member processes with a
//! run-phase; only running members become [`Replica`]s worth probing.

use serde::{Deserialize, Serialize};

use crate::error::MembershipError;

/// Run-phase of a member process as reported by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MemberPhase {
    Pending,
    #[default]
    Running,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

/// One member process of a named cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMember {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub phase: MemberPhase,
    /// Explicit client URL. When unset, the endpoint is derived from
    /// name, cluster and namespace.
    #[serde(default)]
    pub client_url: Option<String>,
}

impl ClusterMember {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, phase: MemberPhase) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            phase,
            client_url: None,
        }
    }

    /// Use `url` instead of the derived endpoint.
    pub fn with_client_url(mut self, url: impl Into<String>) -> Self {
        self.client_url = Some(url.into());
        self
    }

    pub fn is_running(&self) -> bool {
        self.phase == MemberPhase::Running
    }
}

/// Source of cluster members.
#[async_trait::async_trait]
pub trait MemberLister: Send + Sync {
    /// Current members of `cluster` in `namespace`, any phase.
    async fn list_members(
        &self,
        cluster: &str,
        namespace: &str,
    ) -> Result<Vec<ClusterMember>, MembershipError>;
}

/// Fixed member list, filtered by cluster and namespace on every call.
///
/// A member belongs to cluster `c` when its name is `c-<suffix>`.
#[derive(Debug, Clone, Default)]
pub struct StaticMembers {
    members: Vec<ClusterMember>,
}

impl StaticMembers {
    pub fn new(members: Vec<ClusterMember>) -> Self {
        Self { members }
    }
}

#[async_trait::async_trait]
impl MemberLister for StaticMembers {
    async fn list_members(
        &self,
        cluster: &str,
        namespace: &str,
    ) -> Result<Vec<ClusterMember>, MembershipError> {
        Ok(self
            .members
            .iter()
            .filter(|m| m.namespace == namespace && cluster_name_of(&m.name) == cluster)
            .cloned()
            .collect())
    }
}

/// A running member as a backup candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replica {
    pub name: String,
    pub namespace: String,
    /// True when a TLS configuration is in use.
    pub secure: bool,
    endpoint: String,
}

impl Replica {
    /// Build a replica from a member.
    ///
    /// Derived endpoint: `{scheme}://{name}.{cluster}.{namespace}.svc:{port}`.
    pub fn from_member(member: &ClusterMember, secure: bool, port: u16) -> Self {
        let endpoint = match &member.client_url {
            Some(url) => url.clone(),
            None => {
                let scheme = if secure { "https" } else { "http" };
                format!(
                    "{scheme}://{}.{}.{}.svc:{port}",
                    member.name,
                    cluster_name_of(&member.name),
                    member.namespace
                )
            }
        };
        Self {
            name: member.name.clone(),
            namespace: member.namespace.clone(),
            secure,
            endpoint,
        }
    }

    /// Client endpoint URL.
    pub fn client_url(&self) -> &str {
        &self.endpoint
    }
}

/// Cluster name of a member: its name minus the last `-` segment.
pub fn cluster_name_of(member_name: &str) -> &str {
    match member_name.rfind('-') {
        Some(i) => &member_name[..i],
        None => member_name,
    }
}
