//! Snapshot stream decoding.
//!
//! The gateway streams one JSON object per line, each carrying a base64
//! chunk of the snapshot and the number of bytes still to come. The
//! decoder turns that into a plain byte stream and fails if the body ends
//! before a frame reports zero remaining bytes.

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;

use crate::wire::SnapshotFrame;
use crate::{ClientError, SnapshotReader};

/// Upper bound on one encoded frame. etcd sends 32 KiB chunks.
const MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

const OPERATION: &str = "snapshot";

/// Decode a gateway snapshot body into raw snapshot bytes.
pub fn decode_snapshot_stream<R>(body: R) -> SnapshotReader
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let lines = FramedRead::new(body, LinesCodec::new_with_max_length(MAX_FRAME_LEN));

    let chunks = futures_util::stream::try_unfold((lines, false), |(mut lines, complete)| async move {
        loop {
            let Some(line) = lines.next().await else {
                if complete {
                    return Ok(None);
                }
                return Err(std::io::Error::from(ClientError::Decode {
                    operation: OPERATION,
                    reason: "stream ended before the final chunk".into(),
                }));
            };
            let line = line.map_err(std::io::Error::other)?;

            let Some((chunk, remaining)) = decode_frame(&line)? else {
                continue;
            };
            let complete = remaining == 0;
            if chunk.is_empty() {
                if complete {
                    return Ok(None);
                }
                continue;
            }
            return Ok(Some((chunk, (lines, complete))));
        }
    });

    Box::new(StreamReader::new(Box::pin(chunks)))
}

/// Decode one line. Blank lines yield `None`.
fn decode_frame(line: &str) -> Result<Option<(Bytes, i64)>, ClientError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let frame: SnapshotFrame = serde_json::from_str(line).map_err(|e| ClientError::Decode {
        operation: OPERATION,
        reason: e.to_string(),
    })?;

    if let Some(err) = frame.error {
        return Err(ClientError::Remote {
            code: err.code,
            message: err.message,
        });
    }

    let Some(chunk) = frame.result else {
        return Err(ClientError::Decode {
            operation: OPERATION,
            reason: "frame has neither result nor error".into(),
        });
    };

    let blob = data_encoding::BASE64
        .decode(chunk.blob.as_bytes())
        .map_err(|e| ClientError::Decode {
            operation: OPERATION,
            reason: format!("blob is not base64: {e}"),
        })?;

    Ok(Some((Bytes::from(blob), chunk.remaining_bytes)))
}
