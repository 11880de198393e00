//! Fixed-size worker pool for synchronous RPC handlers.
//!
//! `size` OS threads pull jobs from one shared queue. The queue is
//! unbounded: when every worker is busy, new jobs wait their turn instead
//! of being rejected.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Returned when the pool no longer accepts work
#[derive(Debug, thiserror::Error)]
#[error("worker pool is shut down")]
pub struct PoolClosed;

pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(size: usize) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..size)
            .map(|id| {
                let receiver = Arc::clone(&receiver);
                thread::Builder::new()
                    .name(format!("rpc-worker-{id}"))
                    .spawn(move || worker_loop(id, receiver))
            })
            .collect::<std::io::Result<Vec<_>>>()?;

        debug!(workers = size, "Started RPC worker pool");
        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queue a job for the next free worker
    pub fn execute(&self, job: Job) -> Result<(), PoolClosed> {
        match &self.sender {
            Some(sender) => sender.send(job).map_err(|_| PoolClosed),
            None => Err(PoolClosed),
        }
    }

    /// Stop accepting jobs, let queued ones finish, and join the workers.
    pub fn shutdown(mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("RPC worker exited abnormally");
            }
        }
        debug!("RPC worker pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the queue is enough for detached workers to exit
        self.sender.take();
    }
}

fn worker_loop(id: usize, receiver: Arc<Mutex<Receiver<Job>>>) {
    loop {
        let job = {
            let receiver = receiver.lock().unwrap_or_else(PoisonError::into_inner);
            receiver.recv()
        };

        match job {
            Ok(job) => {
                // A panicking job must not shrink the pool
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    error!(worker = id, "RPC job panicked");
                }
            }
            Err(_) => break,
        }
    }
}
