use std::time::Duration;

/// Errors returned by the etcd client layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("dial {endpoint} failed: {source}")]
    Dial {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("dial {endpoint} timed out after {after:?}")]
    DialTimeout { endpoint: String, after: Duration },

    #[error("tls configuration error: {0}")]
    Tls(String),

    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} on {endpoint} timed out after {after:?}")]
    Timeout {
        endpoint: String,
        operation: &'static str,
        after: Duration,
    },

    #[error("{endpoint} answered {operation} with HTTP {status}: {body}")]
    Status {
        endpoint: String,
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("malformed {operation} response: {reason}")]
    Decode {
        operation: &'static str,
        reason: String,
    },

    #[error("server error (code {code}): {message}")]
    Remote { code: i64, message: String },
}

impl From<ClientError> for std::io::Error {
    fn from(e: ClientError) -> Self {
        std::io::Error::other(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_dial_timeout() {
        let err = ClientError::DialTimeout {
            endpoint: "http://a:2379".into(),
            after: Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "dial http://a:2379 timed out after 5s");
    }

    #[test]
    fn test_display_remote() {
        let err = ClientError::Remote {
            code: 14,
            message: "etcdserver: leader changed".into(),
        };
        assert_eq!(
            err.to_string(),
            "server error (code 14): etcdserver: leader changed"
        );
    }

    #[test]
    fn test_into_io_error_keeps_message() {
        let err = ClientError::Decode {
            operation: "snapshot",
            reason: "bad base64".into(),
        };
        let io: std::io::Error = err.into();
        assert_eq!(io.to_string(), "malformed snapshot response: bad base64");
    }
}
