//! Connection session that dispatches newline-delimited JSON requests.
//!
//! Each accepted connection runs [`DispatchConnectionHandler::handle`] on its
//! own thread. The session reads bytes into a [`LineBuffer`], and for every
//! complete line parses a request, runs it on the shared [`WorkerPool`], and
//! writes the response before looking at the next line. Responses therefore
//! leave in request order and a connection never has more than one request in
//! flight.

use std::io::{self, Read};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use crate::pool::WorkerPool;
use crate::transport::{ConnectionHandler, ConnectionStream};

use super::errors::DispatchError;
use super::framing::LineBuffer;
use super::request::Request;
use super::response::{Response, ResponseWriter};
use super::router::{DISPATCH_TARGET, MessageRouter};

const READ_CHUNK: usize = 4096;

/// How long an idle read blocks before the session rechecks for shutdown.
pub(crate) const IDLE_POLL: Duration = Duration::from_millis(500);

/// How long unread input is discarded after a terminal response.
const LINGER_TIMEOUT: Duration = Duration::from_secs(2);

/// Connection handler that frames, routes and answers requests.
#[derive(Debug)]
pub struct DispatchConnectionHandler {
    router: Arc<MessageRouter>,
    pool: Arc<WorkerPool>,
    max_message_bytes: usize,
}

impl DispatchConnectionHandler {
    /// Creates a handler that runs requests through `router` on `pool`.
    pub fn new(router: MessageRouter, pool: Arc<WorkerPool>, max_message_bytes: usize) -> Self {
        Self {
            router: Arc::new(router),
            pool,
            max_message_bytes,
        }
    }

    fn serve(&self, mut stream: ConnectionStream) {
        let peer = stream.peer();
        if let Err(error) = stream.set_read_timeout(Some(IDLE_POLL)) {
            warn!(target: DISPATCH_TARGET, %peer, %error, "failed to set idle read timeout");
        }
        let mut buffer = LineBuffer::new(self.max_message_bytes);
        let mut chunk = [0_u8; READ_CHUNK];

        loop {
            match read_with_retry(&mut stream, &mut chunk) {
                Ok(0) => {
                    debug!(
                        target: DISPATCH_TARGET,
                        %peer,
                        discarded = buffer.pending(),
                        "client closed connection"
                    );
                    break;
                }
                Ok(read) => {
                    buffer.extend(&chunk[..read]);
                    if let Err(error) = self.answer_frames(peer, &mut buffer, &mut stream) {
                        warn!(target: DISPATCH_TARGET, %peer, %error, "closing connection");
                        if error.is_terminal() {
                            linger(&mut stream);
                        }
                        break;
                    }
                }
                Err(error) if is_idle(&error) => {
                    if stream.shutdown_requested() {
                        debug!(target: DISPATCH_TARGET, %peer, "closing idle session for shutdown");
                        break;
                    }
                }
                Err(error) => {
                    warn!(target: DISPATCH_TARGET, %peer, %error, "connection read failed");
                    break;
                }
            }
        }
    }

    /// Answers every complete line in `buffer`.
    ///
    /// Returns an error only when the session must end: oversized input
    /// (after its diagnostic has been sent) or a failed write.
    fn answer_frames(
        &self,
        peer: SocketAddr,
        buffer: &mut LineBuffer,
        stream: &mut ConnectionStream,
    ) -> Result<(), DispatchError> {
        loop {
            let frame = match buffer.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => return Ok(()),
                Err(error) => {
                    ResponseWriter::new(&mut *stream).write_error(&error)?;
                    return Err(error);
                }
            };
            if frame.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let response = self.respond(peer, &frame);
            ResponseWriter::new(&mut *stream).write_response(&response)?;
        }
    }

    fn respond(&self, peer: SocketAddr, frame: &[u8]) -> Response {
        let request = match Request::parse(frame) {
            Ok(request) => request,
            Err(error) => {
                if let DispatchError::MalformedInput { detail } = &error {
                    warn!(target: DISPATCH_TARGET, %peer, detail, "malformed request");
                }
                return error.to_response();
            }
        };
        debug!(target: DISPATCH_TARGET, %peer, op = request.op(), "dispatching request");

        let router = Arc::clone(&self.router);
        let outcome = self
            .pool
            .execute(move || router.route(&request))
            .unwrap_or_else(|error| Err(DispatchError::from(error)));

        match outcome {
            Ok(response) => response,
            Err(error) => {
                match &error {
                    DispatchError::Store(_) | DispatchError::Pool(_) => {
                        error!(target: DISPATCH_TARGET, %peer, %error, "request failed");
                    }
                    _ => debug!(target: DISPATCH_TARGET, %peer, %error, "request rejected"),
                }
                error.to_response()
            }
        }
    }
}

impl ConnectionHandler for DispatchConnectionHandler {
    fn handle(&self, stream: ConnectionStream) {
        self.serve(stream);
    }
}

/// Reads from the stream, retrying on interrupts.
fn read_with_retry(stream: &mut ConnectionStream, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Half-closes the connection and discards what the peer is still sending,
/// so the terminal response is not lost to a reset.
fn linger(stream: &mut ConnectionStream) {
    if stream.shutdown_write().is_err() {
        return;
    }
    let deadline = Instant::now() + LINGER_TIMEOUT;
    let mut sink = [0_u8; READ_CHUNK];
    while Instant::now() < deadline {
        match read_with_retry(stream, &mut sink) {
            Ok(0) => break,
            Ok(_) => {}
            Err(error) if is_idle(&error) => {}
            Err(_) => break,
        }
    }
}

fn is_idle(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
