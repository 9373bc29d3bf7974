//! Line-oriented frame codec.
//!
//! Every frame is written as `<code>:<json>\n`. JSON escapes newlines inside
//! strings, so the `\n` record boundary never appears inside a payload and a
//! decoder only needs to look for the next boundary byte.

use bytes::{Buf as _, BufMut as _, Bytes, BytesMut};

use crate::errors::FrameError;
use crate::frame::{AssistantMessage, ControlData, Frame, FrameKind};

/// Byte that terminates every record.
pub const RECORD_DELIMITER: u8 = b'\n';

#[derive(serde::Serialize, serde::Deserialize)]
struct WireAssistantMessage {
    id: String,
    role: WireRole,
    content: Vec<WireContent>,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
enum WireRole {
    Assistant,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireContent {
    Text { text: WireText },
}

#[derive(serde::Serialize, serde::Deserialize)]
struct WireText {
    value: String,
    #[serde(default)]
    annotations: Vec<serde_json::Value>,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireControlData {
    thread_id: String,
    message_id: String,
}

/// Encodes one frame as a complete record.
pub fn encode(frame: &Frame) -> Result<Bytes, FrameError> {
    let mut buf = BytesMut::new();
    encode_into(frame, &mut buf)?;
    Ok(buf.freeze())
}

/// Appends one encoded frame to `dst`.
///
/// On error nothing is written.
pub fn encode_into(frame: &Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
    let payload = encode_payload(frame).map_err(|e| FrameError::Encode {
        message: format!("{} payload: {e}", frame.kind()),
    })?;
    let mut code = [0_u8; 4];
    let code = frame.kind().code().encode_utf8(&mut code);

    dst.reserve(code.len() + payload.len() + 2);
    dst.put_slice(code.as_bytes());
    dst.put_u8(b':');
    dst.put_slice(&payload);
    dst.put_u8(RECORD_DELIMITER);
    Ok(())
}

fn encode_payload(frame: &Frame) -> Result<Vec<u8>, serde_json::Error> {
    match frame {
        Frame::AssistantMessage(message) => serde_json::to_vec(&WireAssistantMessage {
            id: message.id.clone(),
            role: WireRole::Assistant,
            content: message
                .text_segments
                .iter()
                .map(|segment| WireContent::Text {
                    text: WireText {
                        value: segment.clone(),
                        annotations: Vec::new(),
                    },
                })
                .collect(),
        }),
        Frame::ControlData(control) => serde_json::to_vec(&WireControlData {
            thread_id: control.thread_id.clone(),
            message_id: control.message_id.clone(),
        }),
        Frame::Error { detail } => serde_json::to_vec(detail),
    }
}

/// Extracts one complete frame from the front of `buf`.
///
/// Returns `(None, buf)` untouched when `buf` holds no complete record, and
/// `(Some(frame), rest)` when it does. Never looks past the first record.
pub fn decode(buf: &[u8]) -> Result<(Option<Frame>, &[u8]), FrameError> {
    let Some(end) = buf.iter().position(|byte| *byte == RECORD_DELIMITER) else {
        return Ok((None, buf));
    };
    let frame = parse_record(&buf[..end])?;
    Ok((Some(frame), &buf[end + 1..]))
}

fn parse_record(record: &[u8]) -> Result<Frame, FrameError> {
    let text = std::str::from_utf8(record)
        .map_err(|e| FrameError::malformed(format!("record is not valid UTF-8: {e}")))?;
    let Some((code, payload)) = text.split_once(':') else {
        return Err(FrameError::malformed("record has no type separator"));
    };
    let kind = FrameKind::from_code(code).ok_or_else(|| FrameError::UnknownKind {
        code: code.to_string(),
    })?;
    let invalid = |e: serde_json::Error| FrameError::malformed(format!("{kind} payload: {e}"));

    match kind {
        FrameKind::AssistantMessage => {
            let wire: WireAssistantMessage = serde_json::from_str(payload).map_err(invalid)?;
            Ok(Frame::AssistantMessage(AssistantMessage {
                id: wire.id,
                text_segments: wire
                    .content
                    .into_iter()
                    .map(|WireContent::Text { text }| text.value)
                    .collect(),
            }))
        }
        FrameKind::ControlData => {
            let wire: WireControlData = serde_json::from_str(payload).map_err(invalid)?;
            Ok(Frame::ControlData(ControlData {
                thread_id: wire.thread_id,
                message_id: wire.message_id,
            }))
        }
        FrameKind::Error => {
            let detail: String = serde_json::from_str(payload).map_err(invalid)?;
            Ok(Frame::Error { detail })
        }
    }
}

/// Append-only decode buffer for a chunked byte stream.
///
/// Bytes already searched for a delimiter are not searched again, so a large
/// record arriving in many small chunks is scanned once.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
    scanned: usize,
}

impl FrameDecoder {
    /// Appends a network chunk. Nothing is decoded until `next_frame`.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pops the next complete frame, or `None` when more bytes are needed.
    ///
    /// A malformed record is reported and left in place.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        let Some(offset) = self.buf[self.scanned..]
            .iter()
            .position(|byte| *byte == RECORD_DELIMITER)
        else {
            self.scanned = self.buf.len();
            return Ok(None);
        };
        let end = self.scanned + offset;
        let frame = parse_record(&self.buf[..end])?;
        self.buf.advance(end + 1);
        self.scanned = 0;
        Ok(Some(frame))
    }

    /// Number of buffered bytes not yet decoded.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Checks that the stream ended on a record boundary.
    pub fn finish(&self) -> Result<(), FrameError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(FrameError::Truncated {
                pending: self.buf.len(),
            })
        }
    }
}
