//! Length-prefixed framing over async byte streams.
//!
//! Each frame is a 4-byte big-endian body length followed by the body.

use crate::error::{ProtocolError, ProtocolResult};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default upper bound on a frame body.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

const HEADER_LEN: usize = 4;

/// Writes one frame and flushes.
pub async fn write_frame<W>(writer: &mut W, body: &[u8]) -> ProtocolResult<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(body.len()).map_err(|_| ProtocolError::FrameTooLarge {
        size: body.len(),
        max: u32::MAX as usize,
    })?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame.
///
/// Returns `Ok(None)` if the peer closed the stream cleanly between
/// frames. A body larger than `max_size` is rejected before it is read.
pub async fn read_frame<R>(reader: &mut R, max_size: usize) -> ProtocolResult<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    let mut filled = 0;
    while filled < HEADER_LEN {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            return if filled == 0 {
                Ok(None)
            } else {
                Err(ProtocolError::Truncated)
            };
        }
        filled += n;
    }

    let size = u32::from_be_bytes(header) as usize;
    if size > max_size {
        return Err(ProtocolError::FrameTooLarge {
            size,
            max: max_size,
        });
    }

    let mut body = vec![0u8; size];
    reader.read_exact(&mut body).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ProtocolError::Truncated
        } else {
            ProtocolError::Io(e)
        }
    })?;
    Ok(Some(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_in_sequence() {
        let (mut client, mut server) = tokio::io::duplex(64);

        write_frame(&mut client, b"first").await.unwrap();
        write_frame(&mut client, b"").await.unwrap();
        write_frame(&mut client, b"third").await.unwrap();
        drop(client);

        let max = DEFAULT_MAX_FRAME_SIZE;
        assert_eq!(read_frame(&mut server, max).await.unwrap().unwrap(), b"first");
        assert_eq!(read_frame(&mut server, max).await.unwrap().unwrap(), b"");
        assert_eq!(read_frame(&mut server, max).await.unwrap().unwrap(), b"third");
        assert!(read_frame(&mut server, max).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oversized_frame_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        write_frame(&mut client, &[7u8; 32]).await.unwrap();

        let err = read_frame(&mut server, 16).await.unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge { size: 32, max: 16 }));
    }

    #[tokio::test]
    async fn truncated_header() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&[0, 0]).await.unwrap();
        drop(client);

        let err = read_frame(&mut server, DEFAULT_MAX_FRAME_SIZE).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Truncated));
    }

    #[tokio::test]
    async fn truncated_body() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&10u32.to_be_bytes()).await.unwrap();
        client.write_all(b"abc").await.unwrap();
        drop(client);

        let err = read_frame(&mut server, DEFAULT_MAX_FRAME_SIZE).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Truncated));
    }
}
