//! Test helpers for the transport module.

use std::io::Read;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::{Duration, Instant};

use super::{ConnectionHandler, ConnectionStream};

/// Counts accepted connections without reading from them.
pub(crate) struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            count: Arc::clone(&count),
        });
        (count, handler)
    }
}

impl ConnectionHandler for CountingHandler {
    fn handle(&self, _stream: ConnectionStream) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Holds each connection open until the peer closes it, counting
/// completed sessions.
pub(crate) struct DrainingHandler {
    finished: Arc<AtomicUsize>,
}

impl DrainingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let finished = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            finished: Arc::clone(&finished),
        });
        (finished, handler)
    }
}

impl ConnectionHandler for DrainingHandler {
    fn handle(&self, mut stream: ConnectionStream) {
        let mut sink = Vec::new();
        let _ = stream.read_to_end(&mut sink);
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) fn wait_for_count(count: &AtomicUsize, expected: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if count.load(Ordering::SeqCst) >= expected {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}
