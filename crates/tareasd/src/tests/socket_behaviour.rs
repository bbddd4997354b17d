//! Behavioural tests for the daemon socket listener.

use std::cell::RefCell;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tareas_config::ListenAddress;

use crate::transport::{CountingHandler, ListenerHandle, SocketListener, wait_for_count};

const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

struct ListenerWorld {
    address: ListenAddress,
    listener: Option<ListenerHandle>,
    accepted: Arc<AtomicUsize>,
    bound: Option<SocketAddr>,
    bind_error: Option<String>,
    reserved: Option<TcpListener>,
}

impl ListenerWorld {
    fn new() -> Self {
        Self {
            address: ListenAddress::new("127.0.0.1", 0),
            listener: None,
            accepted: Arc::new(AtomicUsize::new(0)),
            bound: None,
            bind_error: None,
            reserved: None,
        }
    }

    fn start_listener(&mut self) {
        let (count, handler) = CountingHandler::new();
        self.accepted = count;
        let started = SocketListener::bind(&self.address, 16).and_then(|listener| {
            self.bound = Some(listener.local_addr());
            listener.start(handler)
        });
        match started {
            Ok(handle) => self.listener = Some(handle),
            Err(error) => self.bind_error = Some(error.to_string()),
        }
    }

    fn reserve_port(&mut self) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind reserved port");
        let port = listener.local_addr().expect("local addr").port();
        self.address = ListenAddress::new("127.0.0.1", port);
        self.reserved = Some(listener);
    }

    fn bound(&self) -> SocketAddr {
        self.bound.expect("listener address should be set")
    }

    fn connect_clients(&self, count: usize) {
        let addr = self.bound();
        for _ in 0..count {
            TcpStream::connect(addr).expect("connect client");
        }
    }

    fn stop(&mut self) {
        if let Some(handle) = self.listener.take() {
            handle.shutdown();
            handle.join(JOIN_TIMEOUT).expect("join listener");
        }
    }
}

impl Drop for ListenerWorld {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.take() {
            handle.shutdown();
            let _ = handle.join(JOIN_TIMEOUT);
        }
        self.reserved = None;
    }
}

#[fixture]
fn world() -> RefCell<ListenerWorld> {
    RefCell::new(ListenerWorld::new())
}

#[given("a TCP socket listener is running")]
fn given_tcp_listener(world: &RefCell<ListenerWorld>) {
    world.borrow_mut().start_listener();
    assert!(
        world.borrow().bind_error.is_none(),
        "listener start failed: {:?}",
        world.borrow().bind_error
    );
}

#[given("a TCP socket is already bound")]
fn given_tcp_in_use(world: &RefCell<ListenerWorld>) {
    world.borrow_mut().reserve_port();
}

#[when("a client connects")]
fn when_client_connects(world: &RefCell<ListenerWorld>) {
    world.borrow().connect_clients(1);
}

#[when("two clients connect")]
fn when_two_clients_connect(world: &RefCell<ListenerWorld>) {
    world.borrow().connect_clients(2);
}

#[when("the listener starts on the same socket")]
fn when_listener_starts_same_socket(world: &RefCell<ListenerWorld>) {
    world.borrow_mut().start_listener();
}

#[when("the listener is shut down")]
fn when_listener_shut_down(world: &RefCell<ListenerWorld>) {
    world.borrow_mut().stop();
}

#[then("the listener records {count} connections")]
fn then_listener_records_plural(world: &RefCell<ListenerWorld>, count: usize) {
    assert_listener_records(world, count);
}

#[then("the listener records {count} connection")]
fn then_listener_records_singular(world: &RefCell<ListenerWorld>, count: usize) {
    assert_listener_records(world, count);
}

fn assert_listener_records(world: &RefCell<ListenerWorld>, count: usize) {
    let world = world.borrow();
    assert!(
        wait_for_count(&world.accepted, count),
        "expected {count} connections, got {}",
        world.accepted.load(Ordering::SeqCst)
    );
}

#[then("starting the listener fails")]
fn then_listener_fails(world: &RefCell<ListenerWorld>) {
    let world = world.borrow();
    let error = world
        .bind_error
        .as_deref()
        .expect("expected listener start to fail");
    assert!(error.contains("failed to bind"), "unexpected error: {error}");
}

#[then("new clients are refused")]
fn then_clients_refused(world: &RefCell<ListenerWorld>) {
    let addr = world.borrow().bound();
    assert!(
        TcpStream::connect(addr).is_err(),
        "connection should be refused after shutdown"
    );
}

#[scenario(path = "tests/features/daemon_socket.feature", index = 0)]
fn listener_accepts_single_client(#[from(world)] world: RefCell<ListenerWorld>) {
    drop(world);
}

#[scenario(path = "tests/features/daemon_socket.feature", index = 1)]
fn listener_accepts_concurrent_clients(#[from(world)] world: RefCell<ListenerWorld>) {
    drop(world);
}

#[scenario(path = "tests/features/daemon_socket.feature", index = 2)]
fn binding_occupied_port_fails(#[from(world)] world: RefCell<ListenerWorld>) {
    drop(world);
}

#[scenario(path = "tests/features/daemon_socket.feature", index = 3)]
fn stopped_listener_refuses_clients(#[from(world)] world: RefCell<ListenerWorld>) {
    drop(world);
}
