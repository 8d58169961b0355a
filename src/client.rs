//! Client driver: send one file, read back the printable count.
//!
//! The file is streamed in bounded chunks just like the server reads it, so
//! arbitrarily large files never sit in memory whole. Any short write or
//! short read is fatal to the client; there is no retry.

use crate::frame;
use crate::reader::MAX_CHUNK;
use bytes::BytesMut;
use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// Run one full transaction against the server and return the count.
pub async fn run(host: &str, port: u16, path: &Path) -> io::Result<u32> {
    let mut file = File::open(path).await?;
    let len = file.metadata().await?.len();
    let declared: u32 = len.try_into().map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("file is {len} bytes, larger than the protocol's 32-bit length limit"),
        )
    })?;

    let mut stream = TcpStream::connect((host, port)).await?;
    debug!(peer = %stream.peer_addr()?, declared, "Connected");

    send_file(&mut stream, &mut file, declared).await?;

    let mut response = [0u8; frame::FRAME_LEN];
    stream.read_exact(&mut response).await?;
    Ok(frame::decode(response))
}

/// Write the length frame, then stream exactly `declared` bytes of `file`.
///
/// The file yielding fewer bytes than its declared length is an error; the
/// server has already been told to expect all of them.
pub async fn send_file<S, R>(stream: &mut S, file: &mut R, declared: u32) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    stream.write_all(&frame::encode(declared)).await?;

    let mut remaining = declared as usize;
    let mut buffer = BytesMut::with_capacity(MAX_CHUNK.min(remaining));
    while remaining > 0 {
        let chunk = remaining.min(MAX_CHUNK);
        buffer.clear();
        buffer.resize(chunk, 0);
        file.read_exact(&mut buffer[..chunk]).await?;
        stream.write_all(&buffer[..chunk]).await?;
        remaining -= chunk;
    }
    stream.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{bind, Server};
    use tokio::io::duplex;
    use tokio::sync::watch;

    #[tokio::test]
    async fn test_send_file_frames_then_streams() {
        let (mut stream, mut peer) = duplex(1024);
        let mut file: &[u8] = b"hello world";

        send_file(&mut stream, &mut file, 11).await.unwrap();
        drop(stream);

        let mut wire = Vec::new();
        peer.read_to_end(&mut wire).await.unwrap();
        assert_eq!(&wire[..4], &frame::encode(11));
        assert_eq!(&wire[4..], b"hello world");
    }

    #[tokio::test]
    async fn test_send_file_truncated_source_fails() {
        let (mut stream, _peer) = duplex(1024);
        let mut file: &[u8] = b"short";

        let err = send_file(&mut stream, &mut file, 10).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_run_against_live_server() {
        let listener = bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = watch::channel(false);
        let server = tokio::spawn(Server::new().run(listener, rx));

        let path = std::env::temp_dir().join(format!("pcc-client-test-{}", std::process::id()));
        std::fs::write(&path, b"Hi! \x01").unwrap();

        let count = run("127.0.0.1", addr.port(), &path).await.unwrap();
        assert_eq!(count, 4);

        std::fs::remove_file(&path).unwrap();
        tx.send(true).unwrap();
        let totals = server.await.unwrap().unwrap();
        assert_eq!(totals.total(), 4);
    }

    #[tokio::test]
    async fn test_run_missing_file_fails() {
        let err = run("127.0.0.1", 1, Path::new("/nonexistent/pcc-input"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
