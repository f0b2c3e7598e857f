//! Length-prefixed frame codec for the command session.
//!
//! The codec ensures:
//! - Frames are fully buffered before being acted on; partial reads return
//!   Ok(None) to support streaming
//! - Maximum frame size is enforced in both directions
//! - A malformed length field is reported as a desync, which the caller
//!   treats as fatal (there is no resync marker in the wire format)

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::constants::{LENGTH_DELIMITER, MAX_FRAME_SIZE, MAX_LENGTH_DIGITS};
use crate::error::{Error, Result};

/// One decoded unit of the command session wire protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Single-byte tag identifying the frame's semantic kind.
    pub indicator: u8,
    /// Indicator-dependent UTF-8 text.
    pub payload: String,
}

impl Frame {
    pub fn new(indicator: u8, payload: impl Into<String>) -> Self {
        Self {
            indicator,
            payload: payload.into(),
        }
    }
}

/// Codec for length-prefixed text framing.
pub struct Codec;

impl Codec {
    /// Encode a frame to bytes, including the length prefix and the trailing
    /// newline (which is not counted in the length field).
    pub fn encode(frame: &Frame) -> Result<Bytes> {
        let body_len = 1 + frame.payload.len();
        if body_len > MAX_FRAME_SIZE {
            return Err(Error::desync(format!(
                "frame too large: {} bytes (max {})",
                body_len, MAX_FRAME_SIZE
            )));
        }

        let prefix = format!("{}{}", body_len, LENGTH_DELIMITER as char);
        let mut buf = BytesMut::with_capacity(prefix.len() + body_len + 1);
        buf.put_slice(prefix.as_bytes());
        buf.put_u8(frame.indicator);
        buf.put_slice(frame.payload.as_bytes());
        buf.put_u8(b'\n');

        Ok(buf.freeze())
    }

    /// Decode a frame from a buffer.
    ///
    /// Returns:
    /// - Ok(Some(frame)) if a complete frame was decoded (buffer is advanced)
    /// - Ok(None) if more data is needed
    /// - Err on desync: non-numeric or oversized length, zero-length body
    ///
    /// Newlines between frames are consumed and ignored. The frame body is
    /// only consumed on successful decode.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Frame>> {
        // Skip inter-frame newlines
        while buf.first() == Some(&b'\n') {
            buf.advance(1);
        }

        // Locate the length delimiter
        let Some(delim) = buf.iter().position(|&b| b == LENGTH_DELIMITER) else {
            if buf.len() > MAX_LENGTH_DIGITS {
                return Err(Error::desync(format!(
                    "no length delimiter within {} bytes",
                    MAX_LENGTH_DIGITS
                )));
            }
            return Ok(None);
        };

        let len = parse_length(&buf[..delim])?;
        if len == 0 {
            return Err(Error::desync("zero-length frame has no indicator"));
        }
        if len > MAX_FRAME_SIZE {
            return Err(Error::desync(format!(
                "frame length {} exceeds maximum {}",
                len, MAX_FRAME_SIZE
            )));
        }

        // Wait for the full body before consuming anything
        if buf.len() < delim + 1 + len {
            return Ok(None);
        }

        buf.advance(delim + 1);
        let body = buf.split_to(len);
        let payload = std::str::from_utf8(&body[1..])
            .map_err(|e| Error::desync(format!("frame payload is not UTF-8: {}", e)))?
            .to_string();

        Ok(Some(Frame {
            indicator: body[0],
            payload,
        }))
    }

}

fn parse_length(digits: &[u8]) -> Result<usize> {
    if digits.is_empty() || digits.len() > MAX_LENGTH_DIGITS {
        return Err(Error::desync("malformed length field"));
    }
    let text = std::str::from_utf8(digits)
        .map_err(|_| Error::desync("length field is not ASCII"))?;
    text.parse::<usize>()
        .map_err(|_| Error::desync(format!("length field is not numeric: {:?}", text)))
}
