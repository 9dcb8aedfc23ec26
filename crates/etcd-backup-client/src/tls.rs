use std::fmt;
use std::path::Path;
use std::sync::Arc;

use webpki_types::pem::PemObject;
use webpki_types::{CertificateDer, PrivateKeyDer};

use crate::ClientError;

/// Transport security for member connections.
///
/// Presence of a `TlsConfig` switches every member endpoint to `https`.
#[derive(Clone)]
pub struct TlsConfig {
    inner: Arc<rustls::ClientConfig>,
}

impl TlsConfig {
    /// Wrap an existing rustls client configuration.
    pub fn from_rustls(config: Arc<rustls::ClientConfig>) -> Self {
        Self { inner: config }
    }

    /// Build from PEM files: a CA bundle and an optional client
    /// certificate chain + private key for mutual TLS.
    pub fn from_pem_files(ca: &Path, client: Option<(&Path, &Path)>) -> Result<Self, ClientError> {
        let mut roots = rustls::RootCertStore::empty();
        let certs = CertificateDer::pem_file_iter(ca)
            .map_err(|e| ClientError::Tls(format!("read CA bundle {}: {e}", ca.display())))?;
        for cert in certs {
            let cert = cert.map_err(|e| ClientError::Tls(format!("parse CA bundle: {e}")))?;
            roots
                .add(cert)
                .map_err(|e| ClientError::Tls(format!("add CA certificate: {e}")))?;
        }
        if roots.is_empty() {
            return Err(ClientError::Tls(format!(
                "no certificates found in {}",
                ca.display()
            )));
        }

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = rustls::ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| ClientError::Tls(e.to_string()))?
            .with_root_certificates(roots);

        let config = match client {
            Some((cert_path, key_path)) => {
                let chain = CertificateDer::pem_file_iter(cert_path)
                    .and_then(|iter| iter.collect::<Result<Vec<_>, _>>())
                    .map_err(|e| {
                        ClientError::Tls(format!("read client cert {}: {e}", cert_path.display()))
                    })?;
                let key = PrivateKeyDer::from_pem_file(key_path).map_err(|e| {
                    ClientError::Tls(format!("read client key {}: {e}", key_path.display()))
                })?;
                builder
                    .with_client_auth_cert(chain, key)
                    .map_err(|e| ClientError::Tls(e.to_string()))?
            }
            None => builder.with_no_client_auth(),
        };

        Ok(Self::from_rustls(Arc::new(config)))
    }

    /// The underlying rustls configuration.
    pub fn rustls_config(&self) -> &rustls::ClientConfig {
        &self.inner
    }
}

impl fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConfig")
            .field("alpn_protocols", &self.inner.alpn_protocols.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_ca_file_is_tls_error() {
        let err = TlsConfig::from_pem_files(Path::new("/nonexistent/ca.pem"), None).unwrap_err();
        assert!(matches!(err, ClientError::Tls(_)));
    }

    #[test]
    fn empty_ca_bundle_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not a certificate").unwrap();

        let err = TlsConfig::from_pem_files(file.path(), None).unwrap_err();
        match err {
            ClientError::Tls(msg) => assert!(msg.contains("no certificates"), "got: {msg}"),
            e => panic!("expected Tls, got: {e}"),
        }
    }
}
