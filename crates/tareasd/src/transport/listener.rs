//! TCP listener with a polling accept loop.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::thread;
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, Socket, Type};
use tareas_config::ListenAddress;
use tracing::{debug, info, warn};

use super::{ConnectionHandler, ConnectionStream, LISTENER_TARGET, ListenerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Listener bound to a TCP endpoint.
#[derive(Debug)]
pub(crate) struct SocketListener {
    address: ListenAddress,
    local_addr: SocketAddr,
    listener: TcpListener,
}

impl SocketListener {
    /// Resolves and binds `address`, listening with `backlog` pending
    /// connections.
    pub(crate) fn bind(address: &ListenAddress, backlog: u32) -> Result<Self, ListenerError> {
        let listener = bind_tcp(address.host(), address.port(), backlog)?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenerError::Resolve {
                host: address.host().to_owned(),
                port: address.port(),
                source,
            })?;
        Ok(Self {
            address: address.clone(),
            local_addr,
            listener,
        })
    }

    /// Address actually bound; differs from the configured one for port 0.
    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs the accept loop on a background thread.
    pub(crate) fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<ListenerHandle, ListenerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let sessions = Arc::new(AtomicUsize::new(0));
        let local_addr = self.local_addr;
        let accept = AcceptLoop {
            listener: self,
            shutdown: Arc::clone(&shutdown),
            sessions: Arc::clone(&sessions),
            handler,
        };
        let handle = thread::Builder::new()
            .name("tareasd-accept".to_owned())
            .spawn(move || accept.run())
            .map_err(|source| ListenerError::Spawn { source })?;
        Ok(ListenerHandle {
            shutdown,
            sessions,
            local_addr,
            handle: Some(handle),
        })
    }
}

/// Handle to the background listener thread.
pub(crate) struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    sessions: Arc<AtomicUsize>,
    local_addr: SocketAddr,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of sessions still running.
    pub(crate) fn active_sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    /// Stops accepting new connections and tells idle sessions to close.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for the accept thread, which releases the socket, then for open
    /// sessions, bounded by `timeout`.
    pub(crate) fn join(mut self, timeout: Duration) -> Result<(), ListenerError> {
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| ListenerError::ThreadPanic)?;
        }
        let deadline = Instant::now() + timeout;
        while self.active_sessions() > 0 {
            if Instant::now() >= deadline {
                warn!(
                    target: LISTENER_TARGET,
                    remaining = self.active_sessions(),
                    "sessions still open after drain timeout"
                );
                break;
            }
            thread::sleep(DRAIN_POLL);
        }
        Ok(())
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

struct AcceptLoop {
    listener: SocketListener,
    shutdown: Arc<AtomicBool>,
    sessions: Arc<AtomicUsize>,
    handler: Arc<dyn ConnectionHandler>,
}

impl AcceptLoop {
    fn run(self) {
        info!(
            target: LISTENER_TARGET,
            endpoint = %self.listener.address,
            local_addr = %self.listener.local_addr,
            "socket listener active"
        );
        let mut last_error = None::<io::ErrorKind>;
        let mut accepted = 0_u64;
        while !self.shutdown.load(Ordering::SeqCst) {
            match self.accept_connection() {
                Ok(Some(stream)) => {
                    last_error = None;
                    accepted += 1;
                    self.spawn_session(accepted, stream);
                }
                Ok(None) => thread::sleep(ACCEPT_BACKOFF),
                Err(error) => {
                    let kind = error.kind();
                    if last_error != Some(kind) {
                        warn!(
                            target: LISTENER_TARGET,
                            error = %error,
                            "socket accept error"
                        );
                    }
                    last_error = Some(kind);
                    thread::sleep(ERROR_BACKOFF);
                }
            }
        }
        info!(target: LISTENER_TARGET, accepted, "socket listener stopped");
    }

    fn accept_connection(&self) -> io::Result<Option<ConnectionStream>> {
        match self.listener.listener.accept() {
            Ok((stream, peer)) => {
                stream.set_nonblocking(false)?;
                Ok(Some(ConnectionStream::new(
                    stream,
                    peer,
                    Arc::clone(&self.shutdown),
                )))
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn spawn_session(&self, id: u64, stream: ConnectionStream) {
        let peer = stream.peer();
        let guard = SessionGuard::enter(&self.sessions);
        let handler = Arc::clone(&self.handler);
        let spawned = thread::Builder::new()
            .name(format!("tareasd-session-{id}"))
            .spawn(move || {
                let _guard = guard;
                handler.handle(stream);
            });
        match spawned {
            Ok(_) => debug!(target: LISTENER_TARGET, %peer, session = id, "connection accepted"),
            Err(error) => warn!(
                target: LISTENER_TARGET,
                %peer,
                error = %error,
                "failed to spawn session thread; dropping connection"
            ),
        }
    }
}

/// Counts a running session until dropped.
struct SessionGuard(Arc<AtomicUsize>);

impl SessionGuard {
    fn enter(sessions: &Arc<AtomicUsize>) -> Self {
        sessions.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(sessions))
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn bind_tcp(host: &str, port: u16, backlog: u32) -> Result<TcpListener, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?;
    let addr = addrs.next().ok_or_else(|| ListenerError::ResolveEmpty {
        host: host.to_owned(),
        port,
    })?;
    let bind_error = |source| ListenerError::Bind { addr, source };

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(bind_error)?;
    socket.set_reuse_address(true).map_err(bind_error)?;
    socket.bind(&addr.into()).map_err(bind_error)?;
    socket
        .listen(i32::try_from(backlog).unwrap_or(i32::MAX))
        .map_err(bind_error)?;
    Ok(socket.into())
}
