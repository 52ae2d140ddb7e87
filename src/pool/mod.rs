//! Bounded worker pool with first-error-wins cancellation.
//!
//! Split into focused submodules:
//! - [`signal`] - write-once cancellation signal carrying the first fatal error
//! - `worker` - the per-worker pull/fetch/publish loop
//!
//! A [`WorkerPool`] runs a fixed number of workers that pull jobs from a
//! shared intake channel and publish fetched items to an outtake channel
//! sized for every job, so a worker never blocks on publishing. The first
//! worker to fail trips the shared [`CancelSignal`]; the producer's
//! [`submit`](WorkerPool::submit) and every other worker stop at their next
//! job boundary.

pub mod signal;
mod worker;


use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Error, FetchError, Result};

pub use signal::CancelSignal;
use worker::{JobQueue, Worker};

/// Capability that turns a job into an item.
///
/// Called concurrently from every worker of a pool, with different jobs.
/// Retrying, if wanted, happens inside the implementation; the pool treats
/// any returned error as fatal to the run.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync + 'static {
    /// Unit of work; its `Display` form names the job in error messages
    type Job: fmt::Display + Send + Sync + 'static;
    /// Successful outcome of a job
    type Item: Send + 'static;

    /// Fetch the item for `job`
    async fn fetch(&self, job: &Self::Job) -> std::result::Result<Self::Item, FetchError>;
}

/// How a worker task ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WorkerExit {
    /// Intake closed and empty
    Drained,
    /// Stopped because cancellation fired
    Cancelled,
    /// Failed (error recorded on the signal)
    Failed,
}

/// Fixed-size pool of fetch workers.
///
/// Lifecycle: [`new`](Self::new) -> [`start`](Self::start) ->
/// [`submit`](Self::submit)* -> [`close`](Self::close) ->
/// [`wait`](Self::wait) -> [`drain`](Self::drain).
///
/// Dropping the pool closes the intake and, if workers were never waited
/// on, cancels them so they exit after their current job.
pub struct WorkerPool<F: Fetcher> {
    size: usize,
    capacity: usize,
    fetcher: Arc<F>,
    signal: CancelSignal,
    job_tx: Option<mpsc::Sender<F::Job>>,
    job_rx: JobQueue<F::Job>,
    result_tx: Option<mpsc::Sender<F::Item>>,
    result_rx: mpsc::Receiver<F::Item>,
    workers: Vec<JoinHandle<WorkerExit>>,
    live_workers: Arc<AtomicUsize>,
    submitted: usize,
    started: bool,
    workers_cancelled: bool,
}

impl<F: Fetcher> WorkerPool<F> {
    /// Create a pool of `size` workers (at least one) that can accept up to
    /// `capacity` jobs over its lifetime.
    pub fn new(fetcher: Arc<F>, size: usize, capacity: usize) -> Self {
        let size = size.max(1);
        // Hand-off slot of one job: submit waits until a worker takes the previous one
        let (job_tx, job_rx) = mpsc::channel(1);
        // tokio channels need a non-zero bound; an empty run never publishes anyway
        let (result_tx, result_rx) = mpsc::channel(capacity.max(1));

        Self {
            size,
            capacity,
            fetcher,
            signal: CancelSignal::new(),
            job_tx: Some(job_tx),
            job_rx: Arc::new(Mutex::new(job_rx)),
            result_tx: Some(result_tx),
            result_rx,
            workers: Vec::with_capacity(size),
            live_workers: Arc::new(AtomicUsize::new(0)),
            submitted: 0,
            started: false,
            workers_cancelled: false,
        }
    }

    /// Also stop the pool when `shutdown` is cancelled.
    ///
    /// Must be called before [`start`](Self::start).
    pub fn shutdown_on(mut self, shutdown: &CancellationToken) -> Self {
        if self.started {
            warn!("shutdown token attached after pool start, ignoring");
            return self;
        }
        self.signal = CancelSignal::child_of(shutdown);
        self
    }

    /// Number of workers
    pub fn size(&self) -> usize {
        self.size
    }

    /// Maximum number of jobs this pool accepts
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of jobs accepted so far
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Number of worker tasks that have not exited yet
    pub fn live_workers(&self) -> usize {
        self.live_workers.load(Ordering::SeqCst)
    }

    /// The pool's cancellation signal
    pub fn signal(&self) -> &CancelSignal {
        &self.signal
    }

    /// Whether cancellation has fired
    pub fn is_cancelled(&self) -> bool {
        self.signal.is_cancelled()
    }

    /// Spawn the workers. Calling it again is a no-op.
    pub fn start(&mut self) {
        if self.started {
            warn!("worker pool already started");
            return;
        }
        self.started = true;

        let Some(result_tx) = self.result_tx.take() else {
            return;
        };

        for worker_id in 0..self.size {
            let worker = Worker::new(
                worker_id,
                Arc::clone(&self.fetcher),
                Arc::clone(&self.job_rx),
                result_tx.clone(),
                self.signal.clone(),
            );
            let signal = self.signal.clone();
            let live_workers = Arc::clone(&self.live_workers);
            live_workers.fetch_add(1, Ordering::SeqCst);

            let handle = tokio::spawn(async move {
                let result = AssertUnwindSafe(worker.run()).catch_unwind().await;

                let exit = match result {
                    Ok(Ok(processed)) => {
                        debug!(worker = worker_id, processed, "worker exited");
                        WorkerExit::Drained
                    }
                    Ok(Err(Error::Cancelled)) => WorkerExit::Cancelled,
                    Ok(Err(err)) => {
                        error!(worker = worker_id, error = %err, "worker failed");
                        if !signal.trip(err) {
                            debug!(worker = worker_id, "another worker already reported the first error");
                        }
                        WorkerExit::Failed
                    }
                    Err(panic_payload) => {
                        let message = panic_message(panic_payload.as_ref());
                        error!(worker = worker_id, panic = %message, "worker panicked");
                        signal.trip(Error::WorkerPanicked {
                            worker: worker_id,
                            message,
                        });
                        WorkerExit::Failed
                    }
                };

                live_workers.fetch_sub(1, Ordering::SeqCst);
                exit
            });

            self.workers.push(handle);
        }

        info!(
            workers = self.size,
            capacity = self.capacity,
            "worker pool started"
        );
    }

    /// Hand `job` to the pool, waiting while every worker is busy.
    ///
    /// Fails with [`Error::Cancelled`] without enqueuing the job if
    /// cancellation has fired, including while this call is waiting.
    pub async fn submit(&mut self, job: F::Job) -> Result<()> {
        if self.signal.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if !self.started {
            return Err(Error::PoolClosed);
        }
        if self.submitted >= self.capacity {
            return Err(Error::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        let Some(job_tx) = self.job_tx.as_ref() else {
            return Err(Error::PoolClosed);
        };

        let permit = tokio::select! {
            biased;
            _ = self.signal.cancelled() => return Err(Error::Cancelled),
            permit = job_tx.reserve() => permit,
        };

        match permit {
            Ok(permit) => {
                permit.send(job);
                self.submitted += 1;
                Ok(())
            }
            // Every worker is gone, which only happens once the signal fired
            Err(_) => Err(Error::Cancelled),
        }
    }

    /// Close the intake. Workers finish the queued jobs and exit.
    ///
    /// Only the first call has an effect.
    pub fn close(&mut self) {
        if self.job_tx.take().is_some() {
            debug!(submitted = self.submitted, "worker pool intake closed");
        }
    }

    /// Wait for every worker to exit.
    ///
    /// Returns the first error any worker raised. If no worker failed but
    /// some stopped because the pool was cancelled from outside, returns
    /// [`Error::Cancelled`]. Closes the intake first if that has not
    /// happened yet, so waiting can never hang on an open intake.
    ///
    /// Waiting again reports the same outcome. A failure already returned
    /// comes back as [`Error::PoolFailed`] carrying its message.
    pub async fn wait(&mut self) -> Result<()> {
        self.close();
        self.result_tx.take();

        for (worker_id, handle) in std::mem::take(&mut self.workers).into_iter().enumerate() {
            match handle.await {
                Ok(WorkerExit::Cancelled) => self.workers_cancelled = true,
                Ok(WorkerExit::Drained | WorkerExit::Failed) => {}
                Err(join_err) => {
                    error!(worker = worker_id, error = %join_err, "worker task aborted");
                    self.signal.trip(Error::WorkerPanicked {
                        worker: worker_id,
                        message: join_err.to_string(),
                    });
                }
            }
        }

        if let Some(err) = self.signal.take_error() {
            return Err(err);
        }
        if let Some(message) = self.signal.error_message() {
            return Err(Error::PoolFailed { message });
        }
        if self.workers_cancelled {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Take every item currently in the outtake channel.
    ///
    /// After [`wait`](Self::wait) this yields all items the workers produced.
    pub fn drain(&mut self) -> impl Iterator<Item = F::Item> + '_ {
        std::iter::from_fn(move || self.result_rx.try_recv().ok())
    }
}

impl<F: Fetcher> Drop for WorkerPool<F> {
    fn drop(&mut self) {
        self.job_tx.take();
        if !self.workers.is_empty() {
            debug!(
                workers = self.workers.len(),
                "worker pool dropped before wait, cancelling workers"
            );
            self.signal.cancel();
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
