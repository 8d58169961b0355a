//! Bounded chunked reading of a declared payload length.
//!
//! A transaction declares its payload length up front, and that length may
//! be far larger than we are willing to hold in memory. The reader pulls
//! the payload through a single reusable chunk buffer of at most
//! [`MAX_CHUNK`] bytes, handing each completed chunk to a sink, so peak
//! memory stays constant no matter how large the payload is.

use bytes::BytesMut;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Largest working buffer the reader will allocate.
pub const MAX_CHUNK: usize = 1024 * 1024;

/// Read exactly `declared` bytes from `reader`, feeding each chunk to `sink`.
///
/// Chunks are at most `max_chunk` bytes; the final chunk is whatever
/// remains. A single read delivering less than a full chunk is normal
/// stream behavior and is retried; EOF before the declared length is a
/// transaction failure (`UnexpectedEof`) and any partially filled chunk is
/// discarded without reaching the sink.
pub async fn drain_exact<R, F>(
    reader: &mut R,
    declared: u32,
    max_chunk: usize,
    mut sink: F,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    F: FnMut(&[u8]),
{
    let mut remaining = declared as usize;
    let mut buffer = BytesMut::with_capacity(max_chunk.min(remaining));

    while remaining > 0 {
        let chunk = remaining.min(max_chunk);
        buffer.clear();
        buffer.resize(chunk, 0);

        let mut filled = 0;
        while filled < chunk {
            let n = reader.read(&mut buffer[filled..chunk]).await?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "peer closed with {} of {} payload bytes outstanding",
                        remaining - filled,
                        declared
                    ),
                ));
            }
            filled += n;
        }

        sink(&buffer[..chunk]);
        remaining -= chunk;
    }

    Ok(())
}
