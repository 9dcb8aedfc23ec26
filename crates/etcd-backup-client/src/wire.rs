//! JSON shapes of the etcd HTTP/JSON gateway.
//!
//! The gateway encodes 64-bit integers as JSON strings and omits
//! zero-valued fields, so every integer is optional and accepts both forms.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct RangeRequest {
    pub key: String,
    pub serializable: bool,
    pub count_only: bool,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResponseHeader {
    #[serde(default, deserialize_with = "de_i64")]
    pub revision: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RangeResponse {
    #[serde(default)]
    pub header: ResponseHeader,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusResponse {
    #[serde(default)]
    pub header: ResponseHeader,
    #[serde(default)]
    pub version: String,
}

/// One line of the snapshot stream.
#[derive(Debug, Deserialize)]
pub(crate) struct SnapshotFrame {
    pub result: Option<SnapshotChunk>,
    pub error: Option<GatewayError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SnapshotChunk {
    #[serde(default, deserialize_with = "de_i64")]
    pub remaining_bytes: i64,
    #[serde(default)]
    pub blob: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GatewayError {
    #[serde(default, alias = "grpc_code", deserialize_with = "de_i64")]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

fn de_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        Str(String),
    }

    match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(v) => Ok(v),
        IntOrString::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_revision_as_string() {
        let resp: RangeResponse =
            serde_json::from_str(r#"{"header":{"cluster_id":"1","revision":"9","raft_term":"2"}}"#)
                .unwrap();
        assert_eq!(resp.header.revision, 9);
    }

    #[test]
    fn header_revision_as_number() {
        let resp: RangeResponse = serde_json::from_str(r#"{"header":{"revision":42}}"#).unwrap();
        assert_eq!(resp.header.revision, 42);
    }

    #[test]
    fn omitted_revision_is_zero() {
        let resp: RangeResponse = serde_json::from_str(r#"{"header":{}}"#).unwrap();
        assert_eq!(resp.header.revision, 0);
    }

    #[test]
    fn status_version() {
        let resp: StatusResponse = serde_json::from_str(
            r#"{"header":{"revision":"7"},"version":"3.1.8","db_size":"24576"}"#,
        )
        .unwrap();
        assert_eq!(resp.version, "3.1.8");
        assert_eq!(resp.header.revision, 7);
    }

    #[test]
    fn error_frame_accepts_grpc_code() {
        let frame: SnapshotFrame =
            serde_json::from_str(r#"{"error":{"grpc_code":14,"message":"unavailable"}}"#).unwrap();
        let err = frame.error.unwrap();
        assert_eq!(err.code, 14);
        assert_eq!(err.message, "unavailable");
    }

    #[test]
    fn non_numeric_revision_rejected() {
        let res: Result<RangeResponse, _> = serde_json::from_str(r#"{"header":{"revision":"abc"}}"#);
        assert!(res.is_err());
    }
}
