//! Single worker loop: pull a job, fetch it, publish the item.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use crate::error::{Error, Result};

use super::Fetcher;
use super::signal::CancelSignal;

/// Receiving end of the intake channel, shared by every worker of a pool.
///
/// Whoever holds the lock is the next worker to receive a job, so each job
/// is handed to exactly one worker.
pub(super) type JobQueue<J> = Arc<Mutex<mpsc::Receiver<J>>>;

pub(super) struct Worker<F: Fetcher> {
    id: usize,
    fetcher: Arc<F>,
    jobs: JobQueue<F::Job>,
    results: mpsc::Sender<F::Item>,
    signal: CancelSignal,
}

impl<F: Fetcher> Worker<F> {
    pub(super) fn new(
        id: usize,
        fetcher: Arc<F>,
        jobs: JobQueue<F::Job>,
        results: mpsc::Sender<F::Item>,
        signal: CancelSignal,
    ) -> Self {
        Self {
            id,
            fetcher,
            jobs,
            results,
            signal,
        }
    }

    /// Run until the intake closes (returns the number of jobs fetched) or
    /// cancellation is observed (returns [`Error::Cancelled`]).
    ///
    /// A failed fetch ends the loop with that error instead of publishing
    /// anything. Cancellation is only checked between jobs; a fetch that has
    /// started always runs to completion.
    pub(super) async fn run(self) -> Result<usize> {
        let mut processed = 0usize;

        loop {
            if self.signal.is_cancelled() {
                debug!(worker = self.id, processed, "worker observed cancellation");
                return Err(Error::Cancelled);
            }

            let next = tokio::select! {
                biased;
                _ = self.signal.cancelled() => {
                    debug!(worker = self.id, processed, "worker cancelled while idle");
                    return Err(Error::Cancelled);
                }
                job = next_job(&self.jobs) => job,
            };

            let Some(job) = next else {
                debug!(worker = self.id, processed, "job queue closed, worker done");
                return Ok(processed);
            };

            // The job may have been handed over just as another worker failed
            if self.signal.is_cancelled() {
                debug!(worker = self.id, job = %job, "dropping job received after cancellation");
                return Err(Error::Cancelled);
            }

            debug!(worker = self.id, job = %job, "fetching");
            let item = self
                .fetcher
                .fetch(&job)
                .await
                .map_err(|source| Error::Fetch {
                    job: job.to_string(),
                    source,
                })?;
            processed += 1;

            // Capacity covers every job, so this only fails if the pool was dropped
            if self.results.send(item).await.is_err() {
                debug!(worker = self.id, "result channel closed, worker done");
                return Err(Error::Cancelled);
            }
        }
    }
}

async fn next_job<J>(jobs: &JobQueue<J>) -> Option<J> {
    let mut rx = jobs.lock().await;
    rx.recv().await
}
