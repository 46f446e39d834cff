//! Framed message transport over async byte streams.
//!
//! Each frame is a 4-byte big-endian body length followed by one CBOR
//! encoded [`Message`].

use crate::error::{ServerError, ServerResult};
use bytes::BytesMut;
use causal_protocol::codec::FRAME_HEADER_LEN;
use causal_protocol::{decode_message, encode_frame, frame_body_len, Message};
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Reads the next message from `reader`.
///
/// Returns `Ok(None)` when the stream ends cleanly between frames. A
/// stream that ends inside a frame is [`ServerError::ConnectionClosed`].
pub async fn read_frame<R>(reader: &mut R) -> ServerResult<Option<Message>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_LEN];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    }

    let len = frame_body_len(header)?;
    let mut body = BytesMut::zeroed(len);
    match reader.read_exact(&mut body).await {
        Ok(_) => {}
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
            return Err(ServerError::ConnectionClosed)
        }
        Err(err) => return Err(err.into()),
    }

    Ok(Some(decode_message(&body)?))
}

/// Writes one message to `writer` and flushes it.
pub async fn write_frame<W>(writer: &mut W, message: &Message) -> ServerResult<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
