//! Shared fakes: an in-memory cluster behind the `Connector` seam and an
//! in-memory sink. Every connection and snapshot stream is counted on open
//! and on drop.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use etcd_backup::etcd_backup_client::{
    ClientError, Connector, KvClient, MemberStatus, SnapshotReader, TlsConfig,
};
use etcd_backup::{
    parse_revision, BackupCoordinator, BackupSink, ClusterMember, MemberLister, MemberPhase,
    MembershipError, SinkError, SnapshotBytes, StaticMembers,
};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

pub const CLUSTER: &str = "example";
pub const NAMESPACE: &str = "default";

/// Derived endpoint of a member of the test cluster (no TLS).
pub fn endpoint_of(name: &str) -> String {
    format!("http://{name}.{CLUSTER}.{NAMESPACE}.svc:2379")
}

// ── Fake cluster ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum SnapshotBehavior {
    /// Stream these bytes, then EOF.
    Data(Vec<u8>),
    /// The open call fails.
    OpenFails,
    /// Stream these bytes, then fail.
    BreaksAfter(Vec<u8>),
    /// Never yields a byte.
    Hangs,
}

/// A call that never resolves, ignoring the deadline it is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hang {
    Connect,
    Revision,
    Status,
    SnapshotOpen,
}

#[derive(Debug, Clone)]
pub struct FakeMember {
    pub name: String,
    pub phase: MemberPhase,
    pub dial_fails: bool,
    /// `None` makes the revision read fail.
    pub revision: Option<i64>,
    /// `None` makes the status query fail.
    pub version: Option<String>,
    pub snapshot: SnapshotBehavior,
    pub hang: Option<Hang>,
}

impl FakeMember {
    pub fn healthy(name: &str, revision: i64, version: &str, data: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            phase: MemberPhase::Running,
            dial_fails: false,
            revision: Some(revision),
            version: Some(version.to_string()),
            snapshot: SnapshotBehavior::Data(data.to_vec()),
            hang: None,
        }
    }

    pub fn unreachable(name: &str) -> Self {
        Self {
            dial_fails: true,
            ..Self::healthy(name, 0, "3.1.8", b"")
        }
    }

    pub fn phase(mut self, phase: MemberPhase) -> Self {
        self.phase = phase;
        self
    }

    pub fn snapshot(mut self, behavior: SnapshotBehavior) -> Self {
        self.snapshot = behavior;
        self
    }

    pub fn no_version(mut self) -> Self {
        self.version = None;
        self
    }

    pub fn no_revision(mut self) -> Self {
        self.revision = None;
        self
    }

    pub fn hangs(mut self, at: Hang) -> Self {
        self.hang = Some(at);
        self
    }
}

#[derive(Debug, Default)]
pub struct Counters {
    pub connects: AtomicUsize,
    pub closes: AtomicUsize,
    pub snapshot_opens: AtomicUsize,
    pub snapshot_closes: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Every opened connection and stream was closed exactly once.
    pub fn assert_balanced(&self) {
        assert_eq!(
            Self::get(&self.connects),
            Self::get(&self.closes),
            "connections opened vs closed"
        );
        assert_eq!(
            Self::get(&self.snapshot_opens),
            Self::get(&self.snapshot_closes),
            "snapshot streams opened vs closed"
        );
    }
}

/// Connector over a fixed set of fake members, keyed by endpoint.
#[derive(Clone)]
pub struct FakeCluster {
    members: Arc<Vec<FakeMember>>,
    pub counters: Arc<Counters>,
    dialed: Arc<Mutex<Vec<String>>>,
}

impl FakeCluster {
    pub fn new(members: Vec<FakeMember>) -> Self {
        Self {
            members: Arc::new(members),
            counters: Arc::new(Counters::default()),
            dialed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Endpoints dialed so far, in order.
    pub fn dialed(&self) -> Vec<String> {
        self.dialed.lock().unwrap().clone()
    }

    pub fn lister(&self) -> StaticMembers {
        StaticMembers::new(
            self.members
                .iter()
                .map(|m| ClusterMember::new(m.name.clone(), NAMESPACE, m.phase))
                .collect(),
        )
    }
}

#[async_trait::async_trait]
impl Connector for FakeCluster {
    async fn connect(
        &self,
        endpoint: &str,
        _tls: Option<&TlsConfig>,
        dial_timeout: Duration,
    ) -> Result<Box<dyn KvClient>, ClientError> {
        self.dialed.lock().unwrap().push(endpoint.to_string());

        let member = self
            .members
            .iter()
            .find(|m| endpoint_of(&m.name) == endpoint)
            .cloned();
        let Some(member) = member.filter(|m| !m.dial_fails) else {
            return Err(ClientError::DialTimeout {
                endpoint: endpoint.to_string(),
                after: dial_timeout,
            });
        };
        if member.hang == Some(Hang::Connect) {
            return std::future::pending().await;
        }

        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeClient {
            endpoint: endpoint.to_string(),
            member,
            counters: self.counters.clone(),
        }))
    }
}

struct FakeClient {
    endpoint: String,
    member: FakeMember,
    counters: Arc<Counters>,
}

impl FakeClient {
    async fn hang_if(&self, at: Hang) {
        if self.member.hang == Some(at) {
            std::future::pending::<()>().await;
        }
    }

    fn fail(&self, operation: &'static str) -> ClientError {
        ClientError::Timeout {
            endpoint: self.endpoint.clone(),
            operation,
            after: Duration::from_secs(1),
        }
    }
}

#[async_trait::async_trait]
impl KvClient for FakeClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn serializable_revision(&self, _timeout: Duration) -> Result<i64, ClientError> {
        self.hang_if(Hang::Revision).await;
        self.member.revision.ok_or_else(|| self.fail("range"))
    }

    async fn status(&self, _timeout: Duration) -> Result<MemberStatus, ClientError> {
        self.hang_if(Hang::Status).await;
        let version = self.member.version.clone().ok_or_else(|| self.fail("status"))?;
        Ok(MemberStatus {
            version,
            revision: self.member.revision.unwrap_or_default(),
        })
    }

    async fn snapshot(&self, _open_timeout: Duration) -> Result<SnapshotReader, ClientError> {
        self.hang_if(Hang::SnapshotOpen).await;
        let (data, breaks, hangs) = match &self.member.snapshot {
            SnapshotBehavior::OpenFails => return Err(self.fail("snapshot")),
            SnapshotBehavior::Data(d) => (d.clone(), false, false),
            SnapshotBehavior::BreaksAfter(d) => (d.clone(), true, false),
            SnapshotBehavior::Hangs => (Vec::new(), false, true),
        };
        self.counters.snapshot_opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSnapshot {
            data: io::Cursor::new(data),
            breaks,
            hangs,
            counters: self.counters.clone(),
        }))
    }
}

impl Drop for FakeClient {
    fn drop(&mut self) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}

struct FakeSnapshot {
    data: io::Cursor<Vec<u8>>,
    breaks: bool,
    hangs: bool,
    counters: Arc<Counters>,
}

impl AsyncRead for FakeSnapshot {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.hangs {
            return Poll::Pending;
        }
        let exhausted = self.data.position() as usize >= self.data.get_ref().len();
        if exhausted && self.breaks {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "stream reset by member",
            )));
        }
        Pin::new(&mut self.data).poll_read(cx, buf)
    }
}

impl Drop for FakeSnapshot {
    fn drop(&mut self) {
        self.counters.snapshot_closes.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Fake membership ──────────────────────────────────────────────────────

pub struct BrokenLister;

#[async_trait::async_trait]
impl MemberLister for BrokenLister {
    async fn list_members(
        &self,
        _cluster: &str,
        _namespace: &str,
    ) -> Result<Vec<ClusterMember>, MembershipError> {
        Err(MembershipError::Unavailable("api server unreachable".into()))
    }
}

// ── In-memory sink ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemorySink {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail_writes: bool,
    fail_latest: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn failing_latest() -> Self {
        Self {
            fail_latest: true,
            ..Self::default()
        }
    }

    pub fn insert(&self, name: &str, data: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(name.to_string(), data.to_vec());
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.objects.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait::async_trait]
impl BackupSink for MemorySink {
    async fn write(&self, path: &str, snapshot: SnapshotBytes<'_>) -> Result<u64, SinkError> {
        if self.fail_writes {
            return Err(SinkError::Other("bucket is read-only".into()));
        }
        // Buffer fully before publishing so nothing partial is visible
        let mut buf = Vec::new();
        snapshot.read_to_end(&mut buf).await.map_err(|source| SinkError::Io {
            path: path.to_string(),
            source,
        })?;
        let n = buf.len() as u64;
        self.objects.lock().unwrap().insert(path.to_string(), buf);
        Ok(n)
    }

    async fn latest(&self) -> Result<Option<String>, SinkError> {
        if self.fail_latest {
            return Err(SinkError::Other("list objects denied".into()));
        }
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .max_by_key(|name| (parse_revision(name).unwrap_or(-1), (*name).clone()))
            .cloned())
    }
}

// ── Wiring ───────────────────────────────────────────────────────────────

pub fn coordinator(cluster: &FakeCluster, sink: Arc<MemorySink>) -> BackupCoordinator {
    let _ = tracing_subscriber::fmt().with_env_filter("warn").try_init();

    BackupCoordinator::new(
        CLUSTER,
        NAMESPACE,
        Arc::new(cluster.lister()),
        Arc::new(cluster.clone()),
        sink,
    )
}
