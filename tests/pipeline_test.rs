//! Scenario tests for the window pipeline and orchestrator over in-memory
//! fakes: count/fetch pagination, archive rolling, upload-before-checkpoint
//! ordering, empty-window handling, and run aggregation.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use eventvault::adapters::query::{EventPage, EventStore};
use eventvault::adapters::storage::memory::{InMemoryCheckpointStore, InMemoryObjectStore};
use eventvault::adapters::storage::{ArchiveUploader, CheckpointStore, ObjectStore};
use eventvault::config::InitialPosition;
use eventvault::core::export::{
    Orchestrator, OrchestratorSettings, PipelineSettings, WindowPipeline,
};
use eventvault::core::state::Checkpoint;
use eventvault::domain::window::truncate_to_hour;
use eventvault::domain::{Integration, Result, StorageError};
use serde_json::json;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Event store fake over a fixed, timestamp-sorted record set. Counts and
/// fetches behave like the remote store: both are scoped to `[from, to)`
/// and fetches return at most one page in ascending order.
struct FakeEventStore {
    events: Vec<(DateTime<Utc>, serde_json::Value)>,
    fetch_sizes: Mutex<Vec<usize>>,
}

impl FakeEventStore {
    fn new(mut events: Vec<(DateTime<Utc>, serde_json::Value)>) -> Self {
        events.sort_by_key(|(ts, _)| *ts);
        Self {
            events,
            fetch_sizes: Mutex::new(Vec::new()),
        }
    }

    fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// `count` evenly spaced events starting at `start`.
    fn spread(start: DateTime<Utc>, count: usize, spacing: TimeDelta) -> Self {
        let events = (0..count)
            .map(|i| {
                let ts = start + spacing * i as i32;
                (ts, event_at(ts, &format!("event-{i}")))
            })
            .collect();
        Self::new(events)
    }

    fn fetch_sizes(&self) -> Vec<usize> {
        self.fetch_sizes.lock().unwrap().clone()
    }
}

fn event_at(ts: DateTime<Utc>, payload: &str) -> serde_json::Value {
    json!({
        "timestamp": ts.to_rfc3339_opts(SecondsFormat::Millis, true),
        "payload": payload,
    })
}

#[async_trait]
impl EventStore for FakeEventStore {
    async fn count(
        &self,
        _integration: &Integration,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64> {
        Ok(self
            .events
            .iter()
            .filter(|(ts, _)| *ts >= from && *ts < to)
            .count() as u64)
    }

    async fn fetch(
        &self,
        _integration: &Integration,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page_size: usize,
    ) -> Result<EventPage> {
        let records: Vec<serde_json::Value> = self
            .events
            .iter()
            .filter(|(ts, _)| *ts >= from && *ts < to)
            .take(page_size)
            .map(|(_, record)| record.clone())
            .collect();
        self.fetch_sizes.lock().unwrap().push(records.len());
        Ok(EventPage::from_records(records))
    }
}

/// Object store whose uploads always fail.
struct FailingObjectStore;

#[async_trait]
impl ObjectStore for FailingObjectStore {
    async fn put_file(&self, key: &str, _path: &Path, _content_type: &str) -> Result<()> {
        Err(StorageError::Upload {
            key: key.to_string(),
            message: "injected upload failure".to_string(),
        }
        .into())
    }

    async fn put_bytes(&self, key: &str, _bytes: Vec<u8>, _content_type: &str) -> Result<()> {
        Err(StorageError::Upload {
            key: key.to_string(),
            message: "injected upload failure".to_string(),
        }
        .into())
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn list(&self, _prefix: &str, _max: usize) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Checkpoint store that refuses to save while the object store is empty,
/// proving parts are durable before the checkpoint advances.
struct OrderingCheckpointStore {
    inner: InMemoryCheckpointStore,
    objects: Arc<InMemoryObjectStore>,
}

#[async_trait]
impl CheckpointStore for OrderingCheckpointStore {
    async fn load(&self, integration_id: &str) -> Result<Checkpoint> {
        self.inner.load(integration_id).await
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        assert!(
            !self.objects.is_empty(),
            "checkpoint saved before any archive part was uploaded"
        );
        self.inner.save(checkpoint).await
    }
}

fn integration() -> Integration {
    Integration::new("IC-01", "INT03-1", "INT04")
}

fn settings(staging: &Path, page_size: usize, max_part_bytes: u64) -> PipelineSettings {
    PipelineSettings {
        page_size,
        max_part_bytes,
        staging_dir: staging.to_path_buf(),
    }
}

fn seeded_checkpoints(integration_id: &str, at: DateTime<Utc>) -> Arc<InMemoryCheckpointStore> {
    let checkpoints = Arc::new(InMemoryCheckpointStore::new(InitialPosition::Lookback, 24));
    checkpoints.seed(Checkpoint {
        integration_id: integration_id.to_string(),
        last_processed_timestamp: at,
        updated_at: at,
    });
    checkpoints
}

fn pipeline(
    events: Arc<FakeEventStore>,
    checkpoints: Arc<dyn CheckpointStore>,
    objects: Arc<dyn ObjectStore>,
    settings: PipelineSettings,
) -> (WindowPipeline, watch::Sender<bool>) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let pipeline = WindowPipeline::new(
        integration(),
        events,
        checkpoints,
        Arc::new(ArchiveUploader::new(objects)),
        settings,
        shutdown_rx,
    );
    (pipeline, shutdown_tx)
}

#[tokio::test]
async fn window_with_2500_events_pages_three_times_into_one_part() {
    let staging = tempfile::tempdir().unwrap();
    let t0 = truncate_to_hour(Utc::now()) - TimeDelta::hours(2);

    let events = Arc::new(FakeEventStore::spread(t0, 2500, TimeDelta::seconds(1)));
    let checkpoints = seeded_checkpoints(integration().id(), t0);
    let objects = Arc::new(InMemoryObjectStore::new());

    let (pipeline, _shutdown) = pipeline(
        events.clone(),
        checkpoints.clone(),
        objects.clone(),
        settings(staging.path(), 1000, 1024 * 1024 * 1024),
    );
    let report = pipeline.run().await.unwrap();

    // exactly three fetches: 1000, 1000, 500
    assert_eq!(events.fetch_sizes(), vec![1000, 1000, 500]);

    // one archive part under the window partition
    assert_eq!(objects.len(), 1);
    let key = objects.keys().remove(0);
    assert!(key.starts_with("events/integration=IC-01-INT03-1-INT04/"));
    assert!(key.ends_with(".zip"));

    // checkpoint advanced to the window end, exactly once
    assert_eq!(checkpoints.save_count(), 1);
    let stored = checkpoints.stored(integration().id()).unwrap();
    assert_eq!(stored.last_processed_timestamp, t0 + TimeDelta::hours(1));

    assert_eq!(report.windows_processed, 1);
    assert_eq!(report.events_exported, 2500);
    assert_eq!(report.parts_uploaded, 1);
}

#[tokio::test]
async fn empty_windows_create_no_archive_and_leave_checkpoint_untouched() {
    let staging = tempfile::tempdir().unwrap();
    let t0 = truncate_to_hour(Utc::now()) - TimeDelta::hours(3);

    let events = Arc::new(FakeEventStore::empty());
    let checkpoints = seeded_checkpoints(integration().id(), t0);
    let objects = Arc::new(InMemoryObjectStore::new());

    let (pipeline, _shutdown) = pipeline(
        events,
        checkpoints.clone(),
        objects.clone(),
        settings(staging.path(), 1000, 1024 * 1024 * 1024),
    );
    let report = pipeline.run().await.unwrap();

    assert!(objects.is_empty());
    assert_eq!(checkpoints.save_count(), 0);
    let stored = checkpoints.stored(integration().id()).unwrap();
    assert_eq!(stored.last_processed_timestamp, t0);

    assert_eq!(report.windows_processed, 0);
    assert_eq!(report.windows_skipped, 2);
}

#[tokio::test]
async fn checkpoint_changes_once_after_two_empty_windows_then_data() {
    let staging = tempfile::tempdir().unwrap();
    let t0 = truncate_to_hour(Utc::now()) - TimeDelta::hours(4);
    let data_window_start = t0 + TimeDelta::hours(2);

    let events = Arc::new(FakeEventStore::spread(
        data_window_start,
        5,
        TimeDelta::seconds(60),
    ));
    let checkpoints = seeded_checkpoints(integration().id(), t0);
    let objects = Arc::new(InMemoryObjectStore::new());

    let (pipeline, _shutdown) = pipeline(
        events,
        checkpoints.clone(),
        objects.clone(),
        settings(staging.path(), 1000, 1024 * 1024 * 1024),
    );
    let report = pipeline.run().await.unwrap();

    assert_eq!(checkpoints.save_count(), 1);
    let stored = checkpoints.stored(integration().id()).unwrap();
    assert_eq!(
        stored.last_processed_timestamp,
        data_window_start + TimeDelta::hours(1)
    );

    assert_eq!(report.windows_skipped, 2);
    assert_eq!(report.windows_processed, 1);
    assert_eq!(objects.len(), 1);
}

#[tokio::test]
async fn crossing_size_threshold_rolls_into_multiple_uploaded_parts() {
    let staging = tempfile::tempdir().unwrap();
    let t0 = truncate_to_hour(Utc::now()) - TimeDelta::hours(2);

    let events = Arc::new(FakeEventStore::spread(t0, 7, TimeDelta::seconds(1)));
    // every fake event serializes to the same length; fit three per part
    let line_len = serde_json::to_vec(&event_at(t0, "event-0")).unwrap().len() as u64 + 1;

    let checkpoints = seeded_checkpoints(integration().id(), t0);
    let objects = Arc::new(InMemoryObjectStore::new());

    let (pipeline, _shutdown) = pipeline(
        events,
        checkpoints.clone(),
        objects.clone(),
        settings(staging.path(), 1000, line_len * 3),
    );
    let report = pipeline.run().await.unwrap();

    // 7 events at 3 per part -> 3 parts, all uploaded before the checkpoint
    assert_eq!(report.parts_uploaded, 3);
    assert_eq!(objects.len(), 3);
    let keys = objects.keys();
    assert!(keys.iter().any(|k| k.contains("-part1-")));
    assert!(keys.iter().any(|k| k.contains("-part2-")));
    assert!(keys.iter().any(|k| k.contains("-part3-")));
    assert_eq!(checkpoints.save_count(), 1);
}

#[tokio::test]
async fn parts_upload_before_the_checkpoint_advances() {
    let staging = tempfile::tempdir().unwrap();
    let t0 = truncate_to_hour(Utc::now()) - TimeDelta::hours(2);

    let events = Arc::new(FakeEventStore::spread(t0, 100, TimeDelta::seconds(1)));
    let objects = Arc::new(InMemoryObjectStore::new());
    let inner = InMemoryCheckpointStore::new(InitialPosition::Lookback, 24);
    inner.seed(Checkpoint {
        integration_id: integration().id().to_string(),
        last_processed_timestamp: t0,
        updated_at: t0,
    });
    let checkpoints = Arc::new(OrderingCheckpointStore {
        inner,
        objects: objects.clone(),
    });

    let (pipeline, _shutdown) = pipeline(
        events,
        checkpoints,
        objects.clone(),
        settings(staging.path(), 1000, 1024 * 1024 * 1024),
    );

    // the ordering assertion lives inside OrderingCheckpointStore::save
    pipeline.run().await.unwrap();
    assert_eq!(objects.len(), 1);
}

#[tokio::test]
async fn upload_failure_aborts_window_without_checkpoint_advance() {
    let staging = tempfile::tempdir().unwrap();
    let t0 = truncate_to_hour(Utc::now()) - TimeDelta::hours(2);

    let events = Arc::new(FakeEventStore::spread(t0, 10, TimeDelta::seconds(1)));
    let checkpoints = seeded_checkpoints(integration().id(), t0);

    let (pipeline, _shutdown) = pipeline(
        events,
        checkpoints.clone(),
        Arc::new(FailingObjectStore),
        settings(staging.path(), 1000, 1024 * 1024 * 1024),
    );
    let err = pipeline.run().await.unwrap_err();

    assert!(err.to_string().contains("injected upload failure"));
    // in-flight window stays unrecorded: the next run reprocesses it
    assert_eq!(checkpoints.save_count(), 0);
    let stored = checkpoints.stored(integration().id()).unwrap();
    assert_eq!(stored.last_processed_timestamp, t0);
}

#[tokio::test]
async fn shutdown_request_stops_before_the_next_window() {
    let staging = tempfile::tempdir().unwrap();
    let t0 = truncate_to_hour(Utc::now()) - TimeDelta::hours(3);

    let events = Arc::new(FakeEventStore::spread(t0, 10, TimeDelta::seconds(1)));
    let checkpoints = seeded_checkpoints(integration().id(), t0);
    let objects = Arc::new(InMemoryObjectStore::new());

    let (pipeline, shutdown) = pipeline(
        events,
        checkpoints.clone(),
        objects.clone(),
        settings(staging.path(), 1000, 1024 * 1024 * 1024),
    );
    shutdown.send(true).unwrap();

    let report = pipeline.run().await.unwrap();
    // cancelled before any window ran; checkpoint exactly where it was
    assert_eq!(report.windows_processed + report.windows_skipped, 0);
    assert_eq!(checkpoints.save_count(), 0);
    assert!(objects.is_empty());
}

#[tokio::test]
async fn orchestrator_aggregates_all_integration_outcomes() {
    let staging = tempfile::tempdir().unwrap();
    let horizon_edge = truncate_to_hour(Utc::now()) - TimeDelta::hours(1);

    let integrations = vec![
        Integration::new("IC-01", "INT03-1", "INT04"),
        Integration::new("IC-12", "INT27", "INT28"),
    ];

    // both integrations already caught up: zero windows to process
    let checkpoints = Arc::new(InMemoryCheckpointStore::new(InitialPosition::Lookback, 24));
    for integration in &integrations {
        checkpoints.seed(Checkpoint {
            integration_id: integration.id().to_string(),
            last_processed_timestamp: horizon_edge,
            updated_at: horizon_edge,
        });
    }

    let objects = Arc::new(InMemoryObjectStore::new());
    let orchestrator = Orchestrator::new(
        integrations,
        Arc::new(FakeEventStore::empty()),
        checkpoints,
        Arc::new(ArchiveUploader::new(objects)),
        settings(staging.path(), 1000, 1024 * 1024 * 1024),
        OrchestratorSettings {
            max_parallel: 4,
            max_duration: Duration::from_secs(3600),
            drain_delay: Duration::from_secs(0),
        },
    );

    let (_tx, shutdown_rx) = watch::channel(false);
    let summary = orchestrator.run(shutdown_rx).await;

    assert!(summary.success());
    assert_eq!(summary.outcomes().len(), 2);
    assert_eq!(summary.succeeded_count(), 2);
}

#[tokio::test]
async fn orchestrator_failure_in_one_integration_spares_siblings() {
    let staging = tempfile::tempdir().unwrap();
    let t0 = truncate_to_hour(Utc::now()) - TimeDelta::hours(2);
    let horizon_edge = truncate_to_hour(Utc::now()) - TimeDelta::hours(1);

    let failing = Integration::new("IC-01", "INT03-1", "INT04");
    let healthy = Integration::new("IC-12", "INT27", "INT28");

    let checkpoints = Arc::new(InMemoryCheckpointStore::new(InitialPosition::Lookback, 24));
    // the failing integration has a window of data it cannot upload;
    // the healthy one is already caught up
    checkpoints.seed(Checkpoint {
        integration_id: failing.id().to_string(),
        last_processed_timestamp: t0,
        updated_at: t0,
    });
    checkpoints.seed(Checkpoint {
        integration_id: healthy.id().to_string(),
        last_processed_timestamp: horizon_edge,
        updated_at: horizon_edge,
    });

    let orchestrator = Orchestrator::new(
        vec![failing.clone(), healthy.clone()],
        Arc::new(FakeEventStore::spread(t0, 5, TimeDelta::seconds(1))),
        checkpoints,
        Arc::new(ArchiveUploader::new(Arc::new(FailingObjectStore))),
        settings(staging.path(), 1000, 1024 * 1024 * 1024),
        OrchestratorSettings {
            max_parallel: 4,
            max_duration: Duration::from_secs(3600),
            drain_delay: Duration::from_secs(0),
        },
    );

    let (_tx, shutdown_rx) = watch::channel(false);
    let summary = orchestrator.run(shutdown_rx).await;

    assert!(!summary.success());
    assert_eq!(summary.outcomes().len(), 2);
    assert_eq!(summary.succeeded_count(), 1);
    let failed: Vec<&str> = summary
        .failed()
        .iter()
        .map(|o| o.integration_id.as_str())
        .collect();
    assert_eq!(failed, vec![failing.id()]);
}
