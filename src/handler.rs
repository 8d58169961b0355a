//! Per-connection transaction handling.
//!
//! One transaction walks a fixed sequence: read the 4-byte length header,
//! drain exactly that many payload bytes through the bounded reader while
//! tallying printable bytes into a fresh session histogram, send the count
//! back, and only then merge the session histogram into the global one.
//! A failure at any step abandons the transaction: the connection is
//! dropped without a response and the session histogram is discarded, so
//! the global histogram only ever reflects fully completed transactions.

use crate::frame;
use crate::reader;
use crate::scanner::Histogram;
use std::fmt;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Where in the transaction a failure occurred.
///
/// All variants are transaction-scoped: the server logs them and keeps
/// accepting connections.
#[derive(Debug)]
pub enum TransactionError {
    /// Short read or I/O error on the 4-byte length header.
    Header(io::Error),
    /// Short read or I/O error while draining the payload.
    Payload(io::Error),
    /// Short write or I/O error while sending the count back.
    Respond(io::Error),
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionError::Header(e) => write!(f, "failed reading length header: {e}"),
            TransactionError::Payload(e) => write!(f, "failed reading payload: {e}"),
            TransactionError::Respond(e) => write!(f, "failed sending count: {e}"),
        }
    }
}

impl std::error::Error for TransactionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransactionError::Header(e)
            | TransactionError::Payload(e)
            | TransactionError::Respond(e) => Some(e),
        }
    }
}

/// Result of one completed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionOutcome {
    /// Payload length the client declared.
    pub declared: u32,
    /// Printable bytes found in the payload.
    pub printable: u32,
}

/// Run a single transaction over an established stream.
///
/// On success the session tallies have been merged into `totals`. On any
/// error `totals` is untouched; a fully drained payload whose response
/// write failed is still discarded, since the client never saw the count.
pub async fn run<S>(
    stream: &mut S,
    totals: &mut Histogram,
) -> Result<TransactionOutcome, TransactionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    // AwaitLength: the header follows the same exact-read discipline as the
    // payload; a peer that closes early abandons the transaction.
    let mut header = [0u8; frame::FRAME_LEN];
    stream
        .read_exact(&mut header)
        .await
        .map_err(TransactionError::Header)?;
    let declared = frame::decode(header);

    // ReadPayload: chunk by chunk into a session histogram owned by this
    // transaction alone.
    let mut session = Histogram::new();
    let mut printable = 0u32;
    reader::drain_exact(stream, declared, reader::MAX_CHUNK, |chunk| {
        printable += session.scan(chunk);
    })
    .await
    .map_err(TransactionError::Payload)?;

    // Respond: the count goes back in the same 4-byte frame.
    stream
        .write_all(&frame::encode(printable))
        .await
        .map_err(TransactionError::Respond)?;
    stream.flush().await.map_err(TransactionError::Respond)?;

    // Merge: only reached when both the read and the write completed.
    totals.merge(&session);

    Ok(TransactionOutcome { declared, printable })
}
