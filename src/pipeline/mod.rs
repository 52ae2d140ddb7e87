//! End-to-end fetch pipeline: catalog -> worker pool -> sink.
//!
//! The [`Orchestrator`] enumerates every job up front, feeds them through a
//! [`WorkerPool`] sized for that job count, and hands items to the [`Sink`]
//! only after the whole fetch phase succeeded. A single fetch failure fails
//! the run and, unless [`PipelineConfig::persist_partial`] is set, nothing
//! reaches the sink.

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::error::{Error, Result, SaveError};
use crate::pool::{Fetcher, WorkerPool};
use crate::types::{Event, RunReport};

/// Buffer size of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Capability that lists the jobs of a run
#[async_trait::async_trait]
pub trait Catalog: Send + Sync {
    /// Job type produced
    type Job: Send;

    /// Enumerate every job, in submission order. Called once per run.
    async fn list_jobs(&self) -> Result<Vec<Self::Job>>;
}

#[async_trait::async_trait]
impl<C: Catalog + ?Sized> Catalog for Arc<C> {
    type Job = C::Job;

    async fn list_jobs(&self) -> Result<Vec<Self::Job>> {
        (**self).list_jobs().await
    }
}

/// Capability that persists fetched items
#[async_trait::async_trait]
pub trait Sink: Send + Sync {
    /// Item type accepted
    type Item: Send + Sync;

    /// Called once, after a successful fetch phase, before the first `save`.
    ///
    /// A failure here is fatal: no item can be stored.
    async fn prepare(&self) -> std::result::Result<(), SaveError> {
        Ok(())
    }

    /// Store one item. Failures are reported per item and do not stop the run.
    async fn save(&self, item: &Self::Item) -> std::result::Result<(), SaveError>;
}

/// Drives one run of the pipeline
pub struct Orchestrator<C, F, S>
where
    F: Fetcher,
{
    catalog: C,
    fetcher: Arc<F>,
    sink: S,
    config: PipelineConfig,
    shutdown: CancellationToken,
    event_tx: broadcast::Sender<Event>,
}

impl<C, F, S> Orchestrator<C, F, S>
where
    C: Catalog<Job = F::Job>,
    F: Fetcher,
    S: Sink<Item = F::Item>,
    F::Item: Sync,
{
    /// Create an orchestrator
    pub fn new(catalog: C, fetcher: Arc<F>, sink: S, config: PipelineConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            catalog,
            fetcher,
            sink,
            config,
            shutdown: CancellationToken::new(),
            event_tx,
        }
    }

    /// Stop the run when `shutdown` is cancelled (e.g. on Ctrl-C)
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Subscribe to progress events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The sink items are handed to
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run the pipeline to completion.
    ///
    /// Returns the run's counts, or the first fatal error. Sink failures for
    /// individual items are counted in [`RunReport::save_failures`] and never
    /// fail the run.
    pub async fn run(&self) -> Result<RunReport> {
        match self.execute().await {
            Ok(report) => {
                info!(
                    jobs = report.jobs,
                    saved = report.saved,
                    save_failures = report.save_failures,
                    "pipeline complete"
                );
                self.emit(Event::Completed {
                    report: report.clone(),
                });
                Ok(report)
            }
            Err(err) => {
                if err.is_cancelled() {
                    debug!("pipeline cancelled");
                } else {
                    error!(error = %err, "pipeline failed");
                }
                self.emit(Event::Failed {
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn execute(&self) -> Result<RunReport> {
        let jobs = self.catalog.list_jobs().await?;
        let mut report = RunReport {
            jobs: jobs.len(),
            ..Default::default()
        };
        info!(
            jobs = report.jobs,
            workers = self.config.workers,
            "starting fetch phase"
        );
        self.emit(Event::JobsEnumerated { count: report.jobs });

        let mut pool = WorkerPool::new(Arc::clone(&self.fetcher), self.config.workers, jobs.len())
            .shutdown_on(&self.shutdown);
        pool.start();

        let submission = submit_all(&mut pool, jobs).await;
        pool.close();
        let fetched = pool.wait().await;
        let items: Vec<F::Item> = pool.drain().collect();
        report.fetched = items.len();
        for index in 0..items.len() {
            self.emit(Event::ItemFetched { index });
        }

        let fetched = match (submission, fetched) {
            (_, Err(err)) => Err(err),
            (Err(err), Ok(())) => Err(err),
            // Submission stopped early but no worker saw why: the run is incomplete
            (Ok(Submission::Aborted), Ok(())) => Err(Error::Cancelled),
            (Ok(Submission::Complete), Ok(())) => Ok(()),
        };

        if let Err(err) = fetched {
            if self.config.persist_partial && !items.is_empty() && !err.is_cancelled() {
                warn!(
                    fetched = items.len(),
                    error = %err,
                    "fetch phase failed, persisting partial results"
                );
                if let Err(save_err) = self.persist(items, &mut report).await {
                    warn!(error = %save_err, "failed to persist partial results");
                }
            } else if !err.is_cancelled() {
                warn!(
                    discarded = items.len(),
                    "fetch phase failed, discarding fetched items"
                );
            }
            return Err(err);
        }

        self.persist(items, &mut report).await?;
        Ok(report)
    }

    /// Prepare the sink and hand it every item in drain order
    async fn persist(&self, items: Vec<F::Item>, report: &mut RunReport) -> Result<()> {
        self.sink.prepare().await?;

        for (index, item) in items.iter().enumerate() {
            match self.sink.save(item).await {
                Ok(()) => {
                    report.saved += 1;
                    debug!(index, "item saved");
                    self.emit(Event::ItemSaved { index });
                }
                Err(err) => {
                    report.save_failures += 1;
                    warn!(index, error = %err, "failed to save item");
                    self.emit(Event::SaveFailed {
                        index,
                        error: err.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }
}

/// How the submission loop ended
enum Submission {
    /// Every job was accepted
    Complete,
    /// Cancellation was observed before every job was accepted
    Aborted,
}

async fn submit_all<F: Fetcher>(
    pool: &mut WorkerPool<F>,
    jobs: Vec<F::Job>,
) -> Result<Submission> {
    let total = jobs.len();
    for job in jobs {
        match pool.submit(job).await {
            Ok(()) => {}
            Err(Error::Cancelled) => {
                debug!(
                    submitted = pool.submitted(),
                    total, "cancellation observed, stopping submission"
                );
                return Ok(Submission::Aborted);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(Submission::Complete)
}
