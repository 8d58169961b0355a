//! Accept loop and shutdown control for the counting server.
//!
//! The server is deliberately sequential: it accepts one connection, runs
//! its transaction to completion, and only then accepts the next. The
//! global histogram is owned by the loop itself, so merges need no locking.
//! Shutdown is cooperative: a watch flag flipped by Ctrl-C is observed
//! between transactions (and while blocked in accept), never mid-transaction.

use crate::handler;
use crate::scanner::Histogram;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Listen backlog for pending connections.
const BACKLOG: i32 = 10;

/// Bind a listener with SO_REUSEADDR so the server can restart without
/// waiting for the OS to release the port.
pub fn bind(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;
    socket.set_nonblocking(true)?;
    TcpListener::from_std(socket.into())
}

/// Spawn a task that flips the returned shutdown flag on Ctrl-C.
pub fn shutdown_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                let _ = tx.send(true);
            }
            Err(e) => warn!(error = %e, "Failed to listen for shutdown signal"),
        }
    });
    rx
}

/// Server instance: the accept loop plus the cumulative histogram.
pub struct Server {
    totals: Histogram,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    /// Create a server with an empty global histogram.
    pub fn new() -> Self {
        Server {
            totals: Histogram::new(),
        }
    }

    /// Accept and serve connections one at a time until `shutdown` flips.
    ///
    /// Transaction failures are logged and serving continues; transient
    /// accept failures likewise. Any other accept error is fatal and
    /// propagates. On clean exit the accumulated histogram is returned for
    /// the caller to report.
    pub async fn run(
        mut self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> io::Result<Histogram> {
        info!(address = %listener.local_addr()?, "Server listening");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                accepted = listener.accept() => match accepted {
                    Ok((mut stream, addr)) => {
                        debug!(peer = %addr, "New connection");
                        // Run to completion before the next accept; no other
                        // transaction is ever in flight.
                        match handler::run(&mut stream, &mut self.totals).await {
                            Ok(outcome) => debug!(
                                peer = %addr,
                                declared = outcome.declared,
                                printable = outcome.printable,
                                "Transaction complete"
                            ),
                            Err(e) => warn!(peer = %addr, error = %e, "Transaction failed"),
                        }
                    }
                    Err(e) if is_transient_accept(&e) => {
                        warn!(error = %e, "Transient accept failure");
                    }
                    Err(e) => return Err(e),
                },
            }
        }

        info!(total_printable = self.totals.total(), "Server shutting down");
        Ok(self.totals)
    }
}

/// Accept errors that reflect the state of one would-be connection rather
/// than the listening socket itself.
fn is_transient_accept(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::TimedOut
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn send_payload(addr: SocketAddr, payload: &[u8]) -> u32 {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(&frame::encode(payload.len() as u32))
            .await
            .unwrap();
        stream.write_all(payload).await.unwrap();
        let mut response = [0u8; frame::FRAME_LEN];
        stream.read_exact(&mut response).await.unwrap();
        frame::decode(response)
    }

    #[tokio::test]
    async fn test_sequential_clients_accumulate() {
        let listener = bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = watch::channel(false);
        let server = tokio::spawn(Server::new().run(listener, rx));

        assert_eq!(send_payload(addr, b"AA").await, 2);
        assert_eq!(send_payload(addr, b"AA").await, 2);

        tx.send(true).unwrap();
        let totals = server.await.unwrap().unwrap();
        assert_eq!(totals.count_for(b'A'), 4);
        assert_eq!(totals.total(), 4);
    }

    #[tokio::test]
    async fn test_severed_client_leaves_totals_unchanged() {
        let listener = bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = watch::channel(false);
        let server = tokio::spawn(Server::new().run(listener, rx));

        // Declare 100 bytes but deliver only 3, then vanish.
        {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream.write_all(&frame::encode(100)).await.unwrap();
            stream.write_all(b"abc").await.unwrap();
        }

        // The server must still be serving afterwards.
        assert_eq!(send_payload(addr, b"ok").await, 2);

        tx.send(true).unwrap();
        let totals = server.await.unwrap().unwrap();
        // Nothing from the failed transfer made it into the totals.
        assert_eq!(totals.count_for(b'a'), 0);
        assert_eq!(totals.count_for(b'o'), 1);
        assert_eq!(totals.count_for(b'k'), 1);
        assert_eq!(totals.total(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_between_connections() {
        let listener = bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = watch::channel(false);
        let server = tokio::spawn(Server::new().run(listener, rx));

        assert_eq!(send_payload(addr, b"Hi! \x01").await, 4);

        tx.send(true).unwrap();
        let totals = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        // No further transactions ran; the report reflects the one merge.
        assert_eq!(totals.total(), 4);

        // A client arriving after shutdown finds nobody serving.
        let late = TcpStream::connect(addr).await;
        if let Ok(mut stream) = late {
            stream.write_all(&frame::encode(1)).await.ok();
            let mut response = [0u8; frame::FRAME_LEN];
            assert!(stream.read_exact(&mut response).await.is_err());
        }
    }

    #[tokio::test]
    async fn test_empty_payload_transaction() {
        let listener = bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = watch::channel(false);
        let server = tokio::spawn(Server::new().run(listener, rx));

        assert_eq!(send_payload(addr, b"").await, 0);

        tx.send(true).unwrap();
        let totals = server.await.unwrap().unwrap();
        assert_eq!(totals, Histogram::new());
    }

    #[test]
    fn test_transient_accept_classification() {
        for kind in [
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::ConnectionAborted,
            io::ErrorKind::TimedOut,
            io::ErrorKind::BrokenPipe,
            io::ErrorKind::Interrupted,
        ] {
            assert!(is_transient_accept(&io::Error::from(kind)));
        }
        assert!(!is_transient_accept(&io::Error::from(
            io::ErrorKind::PermissionDenied
        )));
        assert!(!is_transient_accept(&io::Error::from(
            io::ErrorKind::InvalidInput
        )));
    }
}
