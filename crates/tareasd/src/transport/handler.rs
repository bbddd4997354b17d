//! Connection handling abstractions for the daemon listener.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// An accepted client connection.
///
/// Carries the daemon's shutdown flag so a session can notice shutdown while
/// idle. Dropping the stream closes the socket.
#[derive(Debug)]
pub struct ConnectionStream {
    stream: TcpStream,
    peer: SocketAddr,
    shutdown: Arc<AtomicBool>,
}

impl ConnectionStream {
    pub(crate) fn new(stream: TcpStream, peer: SocketAddr, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            stream,
            peer,
            shutdown,
        }
    }

    /// Address of the connected client.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Returns `true` once the listener has been asked to stop.
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Bounds how long a single read may block.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the timeout cannot be applied.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.set_read_timeout(timeout)
    }

    /// Closes the write half; the peer sees end of stream after pending
    /// responses.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the socket is already gone.
    pub fn shutdown_write(&self) -> io::Result<()> {
        self.stream.shutdown(Shutdown::Write)
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

/// Handles accepted socket connections.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection until it ends. Implementations should
    /// avoid panicking.
    fn handle(&self, stream: ConnectionStream);
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    #[test]
    fn stream_reports_peer_and_shutdown_flag() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        let addr = listener.local_addr().expect("listener address");
        let client = thread::spawn(move || TcpStream::connect(addr).expect("connect client"));
        let (stream, peer) = listener.accept().expect("accept connection");
        let flag = Arc::new(AtomicBool::new(false));
        let connection = ConnectionStream::new(stream, peer, Arc::clone(&flag));

        let client = client.join().expect("join client");
        assert_eq!(connection.peer(), client.local_addr().expect("client address"));
        assert!(!connection.shutdown_requested());
        flag.store(true, Ordering::SeqCst);
        assert!(connection.shutdown_requested());
    }

    #[test]
    fn writes_reach_the_peer() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        let addr = listener.local_addr().expect("listener address");
        let server = thread::spawn(move || {
            let (stream, peer) = listener.accept().expect("accept connection");
            let mut connection =
                ConnectionStream::new(stream, peer, Arc::new(AtomicBool::new(false)));
            connection.write_all(b"{\"ok\":true}\n").expect("write");
            connection.flush().expect("flush");
        });

        let mut client = TcpStream::connect(addr).expect("connect client");
        let mut received = String::new();
        client.read_to_string(&mut received).expect("read");
        assert_eq!(received, "{\"ok\":true}\n");
        server.join().expect("join server");
    }
}
