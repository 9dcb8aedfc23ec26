//! Settings file for the backup binary.
//!
//! ```toml
//! cluster = "example"
//! namespace = "default"
//! backup_dir = "/var/lib/etcd-backups"
//! # api_prefix = "/v3"
//! # client_port = 2379
//!
//! [timeouts]
//! dial_secs = 5
//! request_secs = 5
//! snapshot_secs = 60
//! max_transfer_secs = 1800
//!
//! [tls]
//! ca = "/etc/etcd/ca.pem"
//! cert = "/etc/etcd/client.pem"
//! key = "/etc/etcd/client-key.pem"
//!
//! [[members]]
//! name = "example-0001"
//! phase = "Running"
//! client_url = "http://127.0.0.1:2379"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use etcd_backup::etcd_backup_client::TlsConfig;
use etcd_backup::{BackupConfig, ClusterMember, MemberPhase};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub cluster: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub backup_dir: PathBuf,
    #[serde(default)]
    pub api_prefix: Option<String>,
    #[serde(default)]
    pub client_port: Option<u16>,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub tls: Option<TlsFiles>,
    #[serde(default)]
    pub members: Vec<MemberEntry>,
}

/// All values in seconds; unset means the library default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Timeouts {
    pub dial_secs: Option<u64>,
    pub request_secs: Option<u64>,
    pub snapshot_secs: Option<u64>,
    pub max_transfer_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TlsFiles {
    pub ca: PathBuf,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberEntry {
    pub name: String,
    #[serde(default)]
    pub phase: MemberPhase,
    #[serde(default)]
    pub client_url: Option<String>,
}

fn default_namespace() -> String {
    "default".to_string()
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read settings {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parse settings {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(raw)?;
        if settings.cluster.is_empty() {
            return Err(anyhow!("cluster must not be empty"));
        }
        Ok(settings)
    }

    pub fn backup_config(&self) -> BackupConfig {
        let t = &self.timeouts;
        let mut config = BackupConfig::new();
        if let Some(secs) = t.dial_secs {
            config = config.dial_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = t.request_secs {
            config = config.request_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = t.snapshot_secs {
            config = config.snapshot_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = t.max_transfer_secs {
            config = config.max_transfer_time(Duration::from_secs(secs));
        }
        if let Some(port) = self.client_port {
            config = config.client_port(port);
        }
        config
    }

    /// Cluster members, stamped with the configured namespace.
    pub fn members(&self) -> Vec<ClusterMember> {
        self.members
            .iter()
            .map(|m| {
                let member = ClusterMember::new(m.name.clone(), self.namespace.clone(), m.phase);
                match &m.client_url {
                    Some(url) => member.with_client_url(url.clone()),
                    None => member,
                }
            })
            .collect()
    }

    pub fn tls_config(&self) -> Result<Option<TlsConfig>> {
        let Some(files) = &self.tls else {
            return Ok(None);
        };
        let client = match (&files.cert, &files.key) {
            (Some(cert), Some(key)) => Some((cert.as_path(), key.as_path())),
            (None, None) => None,
            _ => return Err(anyhow!("tls.cert and tls.key must be set together")),
        };
        Ok(Some(TlsConfig::from_pem_files(&files.ca, client)?))
    }
}
