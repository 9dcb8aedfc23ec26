//! Backup sinks.
//!
//! One capability exposes both ways of persisting a snapshot: `save`
//! (the sink names the artifact from version and revision) and `write`
//! (the caller supplies the full destination path). A sink must never let
//! a partially written artifact show up as the latest backup.

use std::path::{Component, Path, PathBuf};

use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::error::SinkError;
use crate::naming::{make_backup_name, parse_revision, BACKUP_SUFFIX};

/// Snapshot bytes handed to a sink.
pub type SnapshotBytes<'a> = &'a mut (dyn AsyncRead + Send + Unpin);

/// Persistence backend for backup artifacts.
#[async_trait::async_trait]
pub trait BackupSink: Send + Sync {
    /// Persist the stream at `path`. Returns bytes written.
    async fn write(&self, path: &str, snapshot: SnapshotBytes<'_>) -> Result<u64, SinkError>;

    /// Persist the stream under its computed backup name.
    async fn save(
        &self,
        version: &str,
        revision: i64,
        snapshot: SnapshotBytes<'_>,
    ) -> Result<u64, SinkError> {
        let name = make_backup_name(version, revision)?;
        self.write(&name, snapshot).await
    }

    /// Name of the most recent saved backup, `None` when there is none.
    ///
    /// "Most recent" means highest revision; names of one server version
    /// sort the same way lexicographically.
    async fn latest(&self) -> Result<Option<String>, SinkError>;
}

/// Local-disk sink rooted at a directory.
///
/// Writes land in a hidden `.<name>.partial` file that is fsynced and
/// renamed into place, so readers only ever see complete artifacts.
#[derive(Debug, Clone)]
pub struct FileSink {
    root: PathBuf,
}

impl FileSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative destination under the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, SinkError> {
        let invalid = |reason: &str| SinkError::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let rel = Path::new(path);
        if path.is_empty() {
            return Err(invalid("empty path"));
        }
        for component in rel.components() {
            match component {
                Component::Normal(_) => {}
                Component::CurDir => {}
                _ => return Err(invalid("must be relative and stay under the sink root")),
            }
        }
        if rel.file_name().is_none() {
            return Err(invalid("missing file name"));
        }
        Ok(self.root.join(rel))
    }
}

/// Removes the partial file unless the write was committed.
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> SinkError {
    SinkError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Persist directory entries (the rename) so the artifact survives a crash.
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> std::io::Result<()> {
    tokio::fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

#[async_trait::async_trait]
impl BackupSink for FileSink {
    async fn write(&self, path: &str, snapshot: SnapshotBytes<'_>) -> Result<u64, SinkError> {
        let target = self.resolve(path)?;
        let dir = target.parent().unwrap_or(&self.root).to_path_buf();
        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;

        let mut partial = PartialFile {
            path: dir.join(format!(".{file_name}.partial")),
            committed: false,
        };

        let mut file = tokio::fs::File::create(&partial.path)
            .await
            .map_err(|e| io_error(&partial.path, e))?;
        let written = tokio::io::copy(snapshot, &mut file)
            .await
            .map_err(|e| io_error(&partial.path, e))?;
        file.flush().await.map_err(|e| io_error(&partial.path, e))?;
        file.sync_all().await.map_err(|e| io_error(&partial.path, e))?;
        drop(file);

        tokio::fs::rename(&partial.path, &target)
            .await
            .map_err(|e| io_error(&target, e))?;
        partial.committed = true;
        sync_dir(&dir).await.map_err(|e| io_error(&dir, e))?;

        tracing::debug!(path = %target.display(), bytes = written, "backup written");
        Ok(written)
    }

    async fn latest(&self) -> Result<Option<String>, SinkError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&self.root, e)),
        };

        let mut latest: Option<(i64, String)> = None;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&self.root, e))?
        {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') || !name.ends_with(BACKUP_SUFFIX) {
                continue;
            }
            let is_file = entry
                .file_type()
                .await
                .map_err(|e| io_error(&entry.path(), e))?
                .is_file();
            if !is_file {
                continue;
            }
            let Ok(revision) = parse_revision(&name) else {
                tracing::warn!(name = %name, "ignoring unparseable backup name");
                continue;
            };
            let key = (revision, name);
            if latest.as_ref().map_or(true, |cur| key > *cur) {
                latest = Some(key);
            }
        }
        Ok(latest.map(|(_, name)| name))
    }
}
