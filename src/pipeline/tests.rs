use super::*;
use crate::error::FetchError;
use crate::types::Job;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const DEADLINE: Duration = Duration::from_secs(10);

struct ListCatalog {
    jobs: Vec<Job>,
    fail: bool,
}

impl ListCatalog {
    fn with_jobs(count: usize) -> Self {
        Self {
            jobs: (1..=count)
                .map(|i| Job::new(format!("doc-{i}"), "course-1"))
                .collect(),
            fail: false,
        }
    }
}

#[async_trait::async_trait]
impl Catalog for ListCatalog {
    type Job = Job;

    async fn list_jobs(&self) -> Result<Vec<Job>> {
        if self.fail {
            return Err(Error::Catalog("listing unavailable".into()));
        }
        Ok(self.jobs.clone())
    }
}

#[derive(Default)]
struct StubFetcher {
    fail_on: HashSet<String>,
    calls: AtomicUsize,
}

impl StubFetcher {
    fn failing(reference: &str) -> Self {
        Self {
            fail_on: HashSet::from([reference.to_string()]),
            ..Default::default()
        }
    }
}

#[async_trait::async_trait]
impl Fetcher for StubFetcher {
    type Job = Job;
    type Item = String;

    async fn fetch(&self, job: &Job) -> std::result::Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.contains(&job.reference_id) {
            return Err(FetchError::Status {
                url: format!("mock://document/{}", job.reference_id),
                status: 502,
            });
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(format!("item-{}", job.reference_id))
    }
}

#[derive(Default)]
struct RecordingSink {
    fail_on: HashSet<String>,
    fail_prepare: bool,
    prepared: AtomicUsize,
    attempts: StdMutex<Vec<String>>,
}

impl RecordingSink {
    fn attempts(&self) -> Vec<String> {
        let mut attempts = self.attempts.lock().unwrap().clone();
        attempts.sort();
        attempts
    }
}

#[async_trait::async_trait]
impl Sink for RecordingSink {
    type Item = String;

    async fn prepare(&self) -> std::result::Result<(), SaveError> {
        self.prepared.fetch_add(1, Ordering::SeqCst);
        if self.fail_prepare {
            return Err(SaveError::Io {
                path: PathBuf::from("/readonly/out"),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }
        Ok(())
    }

    async fn save(&self, item: &String) -> std::result::Result<(), SaveError> {
        self.attempts.lock().unwrap().push(item.clone());
        if self.fail_on.contains(item) {
            return Err(SaveError::Io {
                path: PathBuf::from(format!("/out/{item}.json")),
                source: std::io::Error::other("disk full"),
            });
        }
        Ok(())
    }
}

fn pipeline_config(workers: usize) -> PipelineConfig {
    PipelineConfig {
        workers,
        ..Default::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_all_success_saves_every_item() {
    let orchestrator = Orchestrator::new(
        ListCatalog::with_jobs(5),
        Arc::new(StubFetcher::default()),
        RecordingSink::default(),
        pipeline_config(2),
    );

    let report = tokio::time::timeout(DEADLINE, orchestrator.run())
        .await
        .expect("run should finish")
        .unwrap();

    assert_eq!(
        report,
        RunReport {
            jobs: 5,
            fetched: 5,
            saved: 5,
            save_failures: 0
        }
    );
    assert_eq!(
        orchestrator.sink().attempts(),
        vec!["item-doc-1", "item-doc-2", "item-doc-3", "item-doc-4", "item-doc-5"]
    );
    assert_eq!(orchestrator.sink().prepared.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fetch_failure_discards_everything() {
    let fetcher = Arc::new(StubFetcher::failing("doc-3"));
    let orchestrator = Orchestrator::new(
        ListCatalog::with_jobs(5),
        Arc::clone(&fetcher),
        RecordingSink::default(),
        pipeline_config(2),
    );

    let err = tokio::time::timeout(DEADLINE, orchestrator.run())
        .await
        .expect("run should finish")
        .unwrap_err();

    assert!(err.to_string().contains("doc-3"), "got: {err}");
    assert!(orchestrator.sink().attempts().is_empty());
    assert_eq!(
        orchestrator.sink().prepared.load(Ordering::SeqCst),
        0,
        "sink must not be touched after a fetch failure"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_zero_jobs_succeeds_without_saving() {
    let fetcher = Arc::new(StubFetcher::default());
    let orchestrator = Orchestrator::new(
        ListCatalog::with_jobs(0),
        Arc::clone(&fetcher),
        RecordingSink::default(),
        pipeline_config(3),
    );

    let report = tokio::time::timeout(DEADLINE, orchestrator.run())
        .await
        .expect("run should finish")
        .unwrap();

    assert_eq!(report, RunReport::default());
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    assert!(orchestrator.sink().attempts().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_save_failure_is_not_fatal() {
    let sink = RecordingSink {
        fail_on: HashSet::from(["item-doc-2".to_string()]),
        ..Default::default()
    };
    let orchestrator = Orchestrator::new(
        ListCatalog::with_jobs(5),
        Arc::new(StubFetcher::default()),
        sink,
        pipeline_config(5),
    );

    let report = tokio::time::timeout(DEADLINE, orchestrator.run())
        .await
        .expect("run should finish")
        .unwrap();

    assert_eq!(report.saved, 4);
    assert_eq!(report.save_failures, 1);
    assert_eq!(
        orchestrator.sink().attempts().len(),
        5,
        "every item is still offered to the sink"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_persist_partial_keeps_fetched_items() {
    let config = PipelineConfig {
        workers: 1,
        persist_partial: true,
    };
    let orchestrator = Orchestrator::new(
        ListCatalog::with_jobs(5),
        Arc::new(StubFetcher::failing("doc-3")),
        RecordingSink::default(),
        config,
    );

    let err = tokio::time::timeout(DEADLINE, orchestrator.run())
        .await
        .expect("run should finish")
        .unwrap_err();

    assert!(matches!(err, Error::Fetch { .. }));
    assert_eq!(
        orchestrator.sink().attempts(),
        vec!["item-doc-1", "item-doc-2"],
        "a single worker fetches in order up to the failure"
    );
}

#[tokio::test]
async fn test_catalog_failure_stops_before_fetching() {
    let fetcher = Arc::new(StubFetcher::default());
    let catalog = ListCatalog {
        jobs: vec![],
        fail: true,
    };
    let orchestrator = Orchestrator::new(
        catalog,
        Arc::clone(&fetcher),
        RecordingSink::default(),
        pipeline_config(2),
    );

    let err = orchestrator.run().await.unwrap_err();
    assert!(matches!(err, Error::Catalog(_)));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_prepare_failure_is_fatal() {
    let sink = RecordingSink {
        fail_prepare: true,
        ..Default::default()
    };
    let orchestrator = Orchestrator::new(
        ListCatalog::with_jobs(3),
        Arc::new(StubFetcher::default()),
        sink,
        pipeline_config(2),
    );

    let err = orchestrator.run().await.unwrap_err();
    assert!(matches!(err, Error::Save(SaveError::Io { .. })));
    assert!(orchestrator.sink().attempts().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shutdown_before_run_cancels() {
    let shutdown = CancellationToken::new();
    shutdown.cancel();
    let fetcher = Arc::new(StubFetcher::default());
    let orchestrator = Orchestrator::new(
        ListCatalog::with_jobs(5),
        Arc::clone(&fetcher),
        RecordingSink::default(),
        pipeline_config(2),
    )
    .with_shutdown(shutdown);

    let err = tokio::time::timeout(DEADLINE, orchestrator.run())
        .await
        .expect("run should finish")
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    assert!(orchestrator.sink().attempts().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_events_describe_the_run() {
    let orchestrator = Orchestrator::new(
        ListCatalog::with_jobs(3),
        Arc::new(StubFetcher::default()),
        RecordingSink {
            fail_on: HashSet::from(["item-doc-1".to_string()]),
            ..Default::default()
        },
        pipeline_config(2),
    );
    let mut events = orchestrator.subscribe();

    orchestrator.run().await.unwrap();

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }

    assert_eq!(received.first(), Some(&Event::JobsEnumerated { count: 3 }));
    assert!(matches!(
        received.last(),
        Some(Event::Completed { report }) if report.saved == 2 && report.save_failures == 1
    ));
    let saved = received
        .iter()
        .filter(|e| matches!(e, Event::ItemSaved { .. }))
        .count();
    let failed = received
        .iter()
        .filter(|e| matches!(e, Event::SaveFailed { .. }))
        .count();
    assert_eq!((saved, failed), (2, 1));

    // Every drained item is announced before any save
    let fetched: Vec<usize> = received
        .iter()
        .filter_map(|e| match e {
            Event::ItemFetched { index } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(fetched, vec![0, 1, 2]);
    let last_fetched = received
        .iter()
        .rposition(|e| matches!(e, Event::ItemFetched { .. }))
        .unwrap();
    let first_save = received
        .iter()
        .position(|e| matches!(e, Event::ItemSaved { .. } | Event::SaveFailed { .. }))
        .unwrap();
    assert!(last_fetched < first_save, "events: {received:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_discarded_items_are_still_reported_fetched() {
    let orchestrator = Orchestrator::new(
        ListCatalog::with_jobs(3),
        Arc::new(StubFetcher::failing("doc-3")),
        RecordingSink::default(),
        pipeline_config(1),
    );
    let mut events = orchestrator.subscribe();

    let err = tokio::time::timeout(DEADLINE, orchestrator.run())
        .await
        .expect("run should finish")
        .unwrap_err();
    assert!(err.to_string().contains("doc-3"), "got: {err}");

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    let fetched = received
        .iter()
        .filter(|e| matches!(e, Event::ItemFetched { .. }))
        .count();
    assert_eq!(fetched, 2, "doc-1 and doc-2 were fetched before the failure");
    assert!(
        !received
            .iter()
            .any(|e| matches!(e, Event::ItemSaved { .. } | Event::SaveFailed { .. })),
        "nothing is saved after a fetch failure"
    );
    assert!(orchestrator.sink().attempts().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_event_names_job() {
    let orchestrator = Orchestrator::new(
        ListCatalog::with_jobs(2),
        Arc::new(StubFetcher::failing("doc-2")),
        RecordingSink::default(),
        pipeline_config(1),
    );
    let mut events = orchestrator.subscribe();

    assert!(orchestrator.run().await.is_err());

    let mut last = None;
    while let Ok(event) = events.try_recv() {
        last = Some(event);
    }
    match last {
        Some(Event::Failed { error }) => assert!(error.contains("doc-2"), "got: {error}"),
        other => panic!("expected Failed event, got: {other:?}"),
    }
}
