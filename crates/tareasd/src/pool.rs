//! Fixed-capacity worker pool shared by every connection.
//!
//! The pool owns a fixed set of worker threads fed from one FIFO queue.
//! Callers submit a closure with [`WorkerPool::execute`] and block until that
//! closure has run on some worker, so the number of closures executing at once
//! never exceeds the pool size no matter how many connections submit work.
//! Excess submissions wait in arrival order.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, warn};

const POOL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::pool");

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Errors surfaced by the worker pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool was configured without workers.
    #[error("worker pool needs at least one worker")]
    ZeroWorkers,
    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread {index}: {source}")]
    Spawn {
        /// Zero-based worker index.
        index: usize,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Work was submitted after shutdown began.
    #[error("worker pool is shut down")]
    ShutDown,
    /// The submitted work panicked; the worker survived.
    #[error("worker panicked: {message}")]
    WorkerPanicked {
        /// Panic payload rendered as text.
        message: String,
    },
    /// The worker dropped the job without reporting a result.
    #[error("worker exited before returning a result")]
    ResultLost,
}

/// Fixed-size pool of worker threads with a shared FIFO queue.
#[derive(Debug)]
pub struct WorkerPool {
    size: usize,
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawns `size` worker threads.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ZeroWorkers`] when `size` is zero and
    /// [`PoolError::Spawn`] when the OS refuses a thread. Workers spawned
    /// before a failure are shut down again.
    pub fn new(size: usize) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::ZeroWorkers);
        }
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let pool = Self {
            size,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(Vec::with_capacity(size)),
        };

        for index in 0..size {
            let queue = Arc::clone(&receiver);
            let spawned = thread::Builder::new()
                .name(format!("tareasd-worker-{index}"))
                .spawn(move || run_worker(index, &queue));
            match spawned {
                Ok(handle) => pool.lock_workers().push(handle),
                Err(source) => {
                    pool.shutdown();
                    return Err(PoolError::Spawn { index, source });
                }
            }
        }
        debug!(target: POOL_TARGET, size, "worker pool started");
        Ok(pool)
    }

    /// Number of worker threads.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Runs `work` on a free worker and blocks until it returns.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ShutDown`] if the pool no longer accepts work,
    /// [`PoolError::WorkerPanicked`] if `work` panicked, and
    /// [`PoolError::ResultLost`] if the result could not be delivered.
    pub fn execute<F, R>(&self, work: F) -> Result<R, PoolError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (result_tx, result_rx) = mpsc::sync_channel(1);
        let job: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(work));
            // The submitter may have gone away; nothing else to do then.
            let _ = result_tx.send(outcome);
        });

        {
            let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(sender) = sender.as_ref() else {
                return Err(PoolError::ShutDown);
            };
            sender.send(job).map_err(|_| PoolError::ShutDown)?;
        }

        match result_rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => Err(PoolError::WorkerPanicked {
                message: panic_message(payload.as_ref()),
            }),
            Err(_) => Err(PoolError::ResultLost),
        }
    }

    /// Closes the queue, lets workers drain queued and in-flight jobs, and
    /// joins them. Later calls are no-ops.
    pub fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_none() {
            return;
        }
        drop(sender);

        let workers = std::mem::take(&mut *self.lock_workers());
        for handle in workers {
            if handle.join().is_err() {
                warn!(target: POOL_TARGET, "worker thread panicked during shutdown");
            }
        }
        debug!(target: POOL_TARGET, size = self.size, "worker pool drained");
    }

    fn lock_workers(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(index: usize, queue: &Mutex<Receiver<Job>>) {
    loop {
        // Hold the queue lock only while dequeuing.
        let next = {
            let receiver = queue.lock().unwrap_or_else(PoisonError::into_inner);
            receiver.recv()
        };
        match next {
            Ok(job) => job(),
            Err(_) => break,
        }
    }
    debug!(target: POOL_TARGET, worker = index, "worker exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use rstest::rstest;

    use super::*;

    #[test]
    fn zero_workers_are_rejected() {
        assert!(matches!(WorkerPool::new(0), Err(PoolError::ZeroWorkers)));
    }

    #[test]
    fn execute_returns_the_closure_result() {
        let pool = WorkerPool::new(2).expect("pool");
        assert_eq!(pool.execute(|| 21 * 2).expect("execute"), 42);
        assert_eq!(pool.size(), 2);
    }

    #[test]
    fn panics_become_errors_and_workers_survive() {
        let pool = WorkerPool::new(1).expect("pool");
        let error = pool
            .execute(|| -> u8 { panic!("boom") })
            .expect_err("panic should surface");
        assert!(matches!(error, PoolError::WorkerPanicked { ref message } if message == "boom"));
        assert_eq!(pool.execute(|| "still alive").expect("worker reused"), "still alive");
    }

    #[rstest]
    #[case::single(1)]
    #[case::few(3)]
    fn concurrency_never_exceeds_pool_size(#[case] size: usize) {
        let pool = Arc::new(WorkerPool::new(size).expect("pool"));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let submitters = size * 4;
        let start = Arc::new(Barrier::new(submitters));

        let handles: Vec<_> = (0..submitters)
            .map(|n| {
                let pool = Arc::clone(&pool);
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    pool.execute(move || {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(20));
                        running.fetch_sub(1, Ordering::SeqCst);
                        n
                    })
                })
            })
            .collect();

        let mut completed: Vec<usize> = handles
            .into_iter()
            .map(|handle| handle.join().expect("join").expect("execute"))
            .collect();
        completed.sort_unstable();
        assert_eq!(completed, (0..submitters).collect::<Vec<_>>());
        assert!(peak.load(Ordering::SeqCst) <= size);
    }

    #[test]
    fn shutdown_drains_queued_work() {
        let pool = Arc::new(WorkerPool::new(1).expect("pool"));
        let finished = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let finished = Arc::clone(&finished);
                thread::spawn(move || {
                    pool.execute(move || {
                        thread::sleep(Duration::from_millis(10));
                        finished.fetch_add(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("join").expect("queued work completes");
        }
        pool.shutdown();
        assert_eq!(finished.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn submissions_after_shutdown_fail() {
        let pool = WorkerPool::new(1).expect("pool");
        pool.shutdown();
        pool.shutdown();
        assert!(matches!(pool.execute(|| ()), Err(PoolError::ShutDown)));
    }
}
