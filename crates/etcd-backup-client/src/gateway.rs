use std::time::Duration;

use futures_util::TryStreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio_util::io::StreamReader;
use url::Url;

use crate::client::{Connector, KvClient, MemberStatus, SnapshotReader};
use crate::snapshot::decode_snapshot_stream;
use crate::wire::{RangeRequest, RangeResponse, StatusResponse};
use crate::{ClientError, TlsConfig, PROBE_KEY};

/// API prefix of the etcd v3 gateway (etcd >= 3.4).
pub const DEFAULT_API_PREFIX: &str = "/v3";

/// Longest error body kept in [`ClientError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Builds [`GatewayClient`]s.
///
/// ```rust
/// use etcd_backup_client::GatewayConnector;
///
/// // etcd 3.3 serves the gateway under /v3beta
/// let connector = GatewayConnector::new().api_prefix("/v3beta");
/// ```
#[derive(Debug, Clone)]
pub struct GatewayConnector {
    api_prefix: String,
}

impl Default for GatewayConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayConnector {
    pub fn new() -> Self {
        Self {
            api_prefix: DEFAULT_API_PREFIX.to_string(),
        }
    }

    /// Set the gateway API prefix (default: `/v3`).
    pub fn api_prefix(mut self, prefix: &str) -> Self {
        self.api_prefix = format!("/{}", prefix.trim_matches('/'));
        self
    }
}

#[async_trait::async_trait]
impl Connector for GatewayConnector {
    async fn connect(
        &self,
        endpoint: &str,
        tls: Option<&TlsConfig>,
        dial_timeout: Duration,
    ) -> Result<Box<dyn KvClient>, ClientError> {
        let client = GatewayClient::connect(endpoint, tls, dial_timeout, &self.api_prefix).await?;
        Ok(Box::new(client))
    }
}

/// etcd client over the HTTP/JSON gateway, bound to one endpoint.
pub struct GatewayClient {
    endpoint: String,
    api_base: String,
    http: reqwest::Client,
}

impl GatewayClient {
    /// Dial `endpoint` and build a client bound to it.
    ///
    /// The TCP dial happens here, under `dial_timeout`, so an unreachable
    /// member is reported before any request is attempted.
    pub async fn connect(
        endpoint: &str,
        tls: Option<&TlsConfig>,
        dial_timeout: Duration,
        api_prefix: &str,
    ) -> Result<Self, ClientError> {
        let url = Url::parse(endpoint).map_err(|e| invalid(endpoint, e.to_string()))?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(invalid(endpoint, format!("unsupported scheme {other}"))),
        }
        let host = url
            .host_str()
            .ok_or_else(|| invalid(endpoint, "missing host".into()))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| invalid(endpoint, "missing port".into()))?;

        match tokio::time::timeout(dial_timeout, TcpStream::connect((host.as_str(), port))).await {
            Ok(Ok(_probe)) => {}
            Ok(Err(source)) => {
                return Err(ClientError::Dial {
                    endpoint: endpoint.to_string(),
                    source,
                })
            }
            Err(_) => {
                return Err(ClientError::DialTimeout {
                    endpoint: endpoint.to_string(),
                    after: dial_timeout,
                })
            }
        }

        let mut builder = reqwest::Client::builder().connect_timeout(dial_timeout);
        if let Some(tls) = tls {
            builder = builder.use_preconfigured_tls(tls.rustls_config().clone());
        }
        let http = builder.build().map_err(|source| ClientError::Request {
            endpoint: endpoint.to_string(),
            source,
        })?;

        tracing::debug!(endpoint, secure = tls.is_some(), "etcd client connected");

        Ok(Self {
            endpoint: endpoint.to_string(),
            api_base: format!("{}{}", endpoint.trim_end_matches('/'), api_prefix),
            http,
        })
    }

    /// POST a JSON body and decode the JSON answer, all under `timeout`.
    async fn call<B, T>(
        &self,
        path: &str,
        body: &B,
        operation: &'static str,
        timeout: Duration,
    ) -> Result<T, ClientError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let request = async {
            let resp = self.send(path, body, operation).await?;
            let bytes = resp.bytes().await.map_err(|source| self.request_error(source))?;
            serde_json::from_slice::<T>(&bytes).map_err(|e| ClientError::Decode {
                operation,
                reason: e.to_string(),
            })
        };

        tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| self.timeout_error(operation, timeout))?
    }

    /// Send the request and reject non-success statuses.
    async fn send<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        operation: &'static str,
    ) -> Result<reqwest::Response, ClientError> {
        let resp = self
            .http
            .post(format!("{}{path}", self.api_base))
            .json(body)
            .send()
            .await
            .map_err(|source| self.request_error(source))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let mut body = resp.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        Err(ClientError::Status {
            endpoint: self.endpoint.clone(),
            operation,
            status: status.as_u16(),
            body,
        })
    }

    fn request_error(&self, source: reqwest::Error) -> ClientError {
        ClientError::Request {
            endpoint: self.endpoint.clone(),
            source,
        }
    }

    fn timeout_error(&self, operation: &'static str, after: Duration) -> ClientError {
        ClientError::Timeout {
            endpoint: self.endpoint.clone(),
            operation,
            after,
        }
    }
}

#[async_trait::async_trait]
impl KvClient for GatewayClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn serializable_revision(&self, timeout: Duration) -> Result<i64, ClientError> {
        let request = RangeRequest {
            key: data_encoding::BASE64.encode(PROBE_KEY),
            serializable: true,
            count_only: true,
        };
        let resp: RangeResponse = self.call("/kv/range", &request, "range", timeout).await?;
        Ok(resp.header.revision)
    }

    async fn status(&self, timeout: Duration) -> Result<MemberStatus, ClientError> {
        let resp: StatusResponse = self
            .call("/maintenance/status", &serde_json::json!({}), "status", timeout)
            .await?;
        if resp.version.is_empty() {
            return Err(ClientError::Decode {
                operation: "status",
                reason: "empty version".into(),
            });
        }
        Ok(MemberStatus {
            version: resp.version,
            revision: resp.header.revision,
        })
    }

    async fn snapshot(&self, open_timeout: Duration) -> Result<SnapshotReader, ClientError> {
        let empty = serde_json::json!({});
        let open = self.send("/maintenance/snapshot", &empty, "snapshot");
        let resp = tokio::time::timeout(open_timeout, open)
            .await
            .map_err(|_| self.timeout_error("snapshot", open_timeout))??;

        let body = resp.bytes_stream().map_err(std::io::Error::other);
        Ok(decode_snapshot_stream(StreamReader::new(Box::pin(body))))
    }
}

impl Drop for GatewayClient {
    fn drop(&mut self) {
        tracing::debug!(endpoint = %self.endpoint, "etcd client closed");
    }
}

fn invalid(endpoint: &str, reason: String) -> ClientError {
    ClientError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    }
}
