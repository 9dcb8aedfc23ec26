use std::time::Duration;

/// Default TCP dial timeout for member connections.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for lightweight requests (revision probes).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for the status query and the snapshot open call.
pub const DEFAULT_SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default ceiling on streaming + persisting one snapshot.
pub const DEFAULT_MAX_TRANSFER_TIME: Duration = Duration::from_secs(30 * 60);

/// Default etcd client port.
pub const DEFAULT_CLIENT_PORT: u16 = 2379;

/// Timing and addressing configuration for a
/// [`BackupCoordinator`](crate::BackupCoordinator).
///
/// Process-wide: built once and shared by every attempt.
///
/// ```rust
/// use std::time::Duration;
/// use etcd_backup::BackupConfig;
///
/// let config = BackupConfig::new()
///     .request_timeout(Duration::from_secs(2))
///     .snapshot_timeout(Duration::from_secs(120));
/// ```
#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub(crate) dial_timeout: Duration,
    pub(crate) request_timeout: Duration,
    pub(crate) snapshot_timeout: Duration,
    /// Safety net only. Individual snapshot chunks have no deadline.
    pub(crate) max_transfer_time: Duration,
    pub(crate) client_port: u16,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl BackupConfig {
    /// Create a config with defaults.
    ///
    /// If `ETCD_BACKUP_MAX_TRANSFER_SECS` is set to a positive integer it
    /// replaces the default transfer ceiling. Override with
    /// [`.max_transfer_time()`](Self::max_transfer_time).
    pub fn new() -> Self {
        let max_transfer_time = std::env::var("ETCD_BACKUP_MAX_TRANSFER_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_MAX_TRANSFER_TIME);

        Self {
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            snapshot_timeout: DEFAULT_SNAPSHOT_TIMEOUT,
            max_transfer_time,
            client_port: DEFAULT_CLIENT_PORT,
        }
    }

    /// Set the member dial timeout (default: 5s).
    pub fn dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    /// Set the revision probe timeout (default: 5s).
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the status / snapshot-open timeout (default: 60s).
    pub fn snapshot_timeout(mut self, timeout: Duration) -> Self {
        self.snapshot_timeout = timeout;
        self
    }

    /// Set the overall transfer ceiling (default: 30min).
    pub fn max_transfer_time(mut self, limit: Duration) -> Self {
        self.max_transfer_time = limit;
        self
    }

    /// Set the etcd client port used for derived endpoints (default: 2379).
    pub fn client_port(mut self, port: u16) -> Self {
        self.client_port = port;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = BackupConfig::new();
        assert_eq!(c.dial_timeout, DEFAULT_DIAL_TIMEOUT);
        assert_eq!(c.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(c.snapshot_timeout, DEFAULT_SNAPSHOT_TIMEOUT);
        assert_eq!(c.client_port, 2379);
    }

    #[test]
    fn builder_overrides() {
        let c = BackupConfig::new()
            .dial_timeout(Duration::from_millis(100))
            .request_timeout(Duration::from_millis(200))
            .snapshot_timeout(Duration::from_secs(3))
            .max_transfer_time(Duration::from_secs(4))
            .client_port(12379);
        assert_eq!(c.dial_timeout, Duration::from_millis(100));
        assert_eq!(c.request_timeout, Duration::from_millis(200));
        assert_eq!(c.snapshot_timeout, Duration::from_secs(3));
        assert_eq!(c.max_transfer_time, Duration::from_secs(4));
        assert_eq!(c.client_port, 12379);
    }
}
