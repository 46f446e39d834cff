//! CBOR wire codec and length-prefixed framing.
//!
//! A frame is a 4-byte big-endian body length followed by the CBOR
//! encoding of one [`Message`].

use crate::error::{ProtocolError, ProtocolResult};
use crate::messages::Message;
use bytes::{BufMut, Bytes, BytesMut};

/// Size of the frame length prefix.
pub const FRAME_HEADER_LEN: usize = 4;

/// Largest accepted frame body.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Encodes a message to CBOR bytes.
pub fn encode_message(message: &Message) -> ProtocolResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(message, &mut buf)
        .map_err(|e| ProtocolError::encoding(e.to_string()))?;
    Ok(buf)
}

/// Decodes a message from CBOR bytes.
pub fn decode_message(bytes: &[u8]) -> ProtocolResult<Message> {
    ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::decoding(e.to_string()))
}

/// Encodes a message as a length-prefixed frame.
pub fn encode_frame(message: &Message) -> ProtocolResult<Bytes> {
    let body = encode_message(message)?;
    let len = checked_frame_len(body.len())?;

    let mut frame = BytesMut::with_capacity(FRAME_HEADER_LEN + body.len());
    frame.put_u32(len);
    frame.put_slice(&body);
    Ok(frame.freeze())
}

/// Parses a frame header and validates the announced body length.
pub fn frame_body_len(header: [u8; FRAME_HEADER_LEN]) -> ProtocolResult<usize> {
    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }
    Ok(len)
}

fn checked_frame_len(len: usize) -> ProtocolResult<u32> {
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }
    // MAX_FRAME_LEN fits in a u32.
    Ok(len as u32)
}
