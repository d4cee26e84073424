use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::collector::{Collector, CollectorError};
use crate::monitor::store::SnapshotStore;
use crate::monitor::view::SqlLimit;

/// Default cadence of the system-resource stream.
pub const DEFAULT_RESOURCE_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshIntervals {
    /// `None`: metrics are fetched on demand only (start, row-limit change,
    /// explicit refresh).
    pub metrics: Option<Duration>,
    pub resources: Duration,
}

impl Default for RefreshIntervals {
    fn default() -> Self {
        Self {
            metrics: None,
            resources: DEFAULT_RESOURCE_INTERVAL,
        }
    }
}

/// Drives the two polling loops that keep the [`SnapshotStore`] fed.
///
/// Each loop fetches, publishes, then waits; a new request is only issued
/// after the previous one finished, so a loop never has two requests in
/// flight. Failures mark the stream stale and the loop carries on at its
/// normal pace.
pub struct RefreshScheduler {
    collector: Arc<dyn Collector>,
    store: Arc<SnapshotStore>,
    intervals: RefreshIntervals,
    limit_tx: watch::Sender<SqlLimit>,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl RefreshScheduler {
    pub fn new(
        collector: Arc<dyn Collector>,
        store: Arc<SnapshotStore>,
        intervals: RefreshIntervals,
        limit: SqlLimit,
    ) -> Self {
        Self {
            collector,
            store,
            intervals,
            limit_tx: watch::Sender::new(limit),
            refresh: Arc::new(Notify::new()),
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Spawn both loops on the current runtime. Calling it while running
    /// is a no-op; after [`stop`](Self::stop) a fresh cancellation token is
    /// used.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }

        info!(
            metrics_interval = ?self.intervals.metrics,
            resources_interval = ?self.intervals.resources,
            "starting refresh loops"
        );

        let metrics = MetricsLoop {
            collector: self.collector.clone(),
            store: self.store.clone(),
            interval: self.intervals.metrics,
            limit_rx: self.limit_tx.subscribe(),
            refresh: self.refresh.clone(),
            cancel: self.cancel.clone(),
        };
        let resources = ResourcesLoop {
            collector: self.collector.clone(),
            store: self.store.clone(),
            interval: self.intervals.resources,
            cancel: self.cancel.clone(),
        };

        self.tasks.push(tokio::spawn(metrics.run()));
        self.tasks.push(tokio::spawn(resources.run()));
    }

    /// Cancel both loops and wait for them to finish. Once this returns
    /// the store is not touched again, even by responses still in flight.
    /// Safe to call repeatedly.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await
                && !e.is_cancelled()
            {
                warn!(error = %e, "refresh loop ended abnormally");
            }
        }
    }

    /// Ask the metrics loop for a fetch now.
    pub fn request_metrics(&self) {
        self.refresh.notify_one();
    }

    /// New active-SQL row limit; triggers a metrics fetch when it changed.
    pub fn set_sql_limit(&self, limit: SqlLimit) {
        self.limit_tx.send_if_modified(|current| {
            let changed = *current != limit;
            *current = limit;
            changed
        });
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Outcome handling shared by both loops. Returns `false` when the loop
/// was cancelled and the result was discarded.
fn settle<T>(
    stream: &'static str,
    cancel: &CancellationToken,
    started: Instant,
    result: Result<T, CollectorError>,
    publish: impl FnOnce(T),
    mark_stale: impl FnOnce(String),
) -> bool {
    if cancel.is_cancelled() {
        debug!(stream, "discarding response after cancellation");
        return false;
    }
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    match result {
        Ok(snapshot) => {
            publish(snapshot);
            debug!(stream, elapsed_ms, "snapshot published");
        }
        Err(e) => {
            warn!(stream, elapsed_ms, error = %e, "poll failed, keeping last snapshot");
            mark_stale(e.user_message());
        }
    }
    true
}

struct MetricsLoop {
    collector: Arc<dyn Collector>,
    store: Arc<SnapshotStore>,
    interval: Option<Duration>,
    limit_rx: watch::Receiver<SqlLimit>,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
}

impl MetricsLoop {
    async fn run(mut self) {
        loop {
            let limit = *self.limit_rx.borrow_and_update();
            let started = Instant::now();

            let result = tokio::select! {
                () = self.cancel.cancelled() => break,
                result = self.collector.fetch_metrics(limit) => result,
            };
            let store = &self.store;
            if !settle(
                "metrics",
                &self.cancel,
                started,
                result,
                |s| store.publish_metrics(s),
                |m| store.mark_metrics_stale(m),
            ) {
                break;
            }

            if !self.wait_next().await {
                break;
            }
        }
        debug!("metrics loop stopped");
    }

    /// Wait for the next cycle; `false` when cancelled.
    async fn wait_next(&mut self) -> bool {
        let interval = self.interval;
        let sleep = async move {
            match interval {
                Some(interval) => tokio::time::sleep(interval).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            () = self.cancel.cancelled() => false,
            () = self.refresh.notified() => true,
            changed = self.limit_rx.changed() => changed.is_ok(),
            () = sleep => true,
        }
    }
}

struct ResourcesLoop {
    collector: Arc<dyn Collector>,
    store: Arc<SnapshotStore>,
    interval: Duration,
    cancel: CancellationToken,
}

impl ResourcesLoop {
    async fn run(self) {
        loop {
            let started = Instant::now();
            let result = tokio::select! {
                () = self.cancel.cancelled() => break,
                result = self.collector.fetch_resources() => result,
            };
            let store = &self.store;
            if !settle(
                "resources",
                &self.cancel,
                started,
                result,
                |s| store.publish_resources(s),
                |m| store.mark_resources_stale(m),
            ) {
                break;
            }

            tokio::select! {
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }
        }
        debug!("resources loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockCollector;
    use crate::model::metrics::TableStatsRow;
    use crate::model::{MetricsSnapshot, SystemResourceSnapshot};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;

    const FAST: Duration = Duration::from_millis(10);

    async fn wait_for(counter: &AtomicUsize, at_least: usize) -> bool {
        for _ in 0..200 {
            if MockCollector::count(counter) >= at_least {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    fn scheduler(
        mock: &Arc<MockCollector>,
        store: &Arc<SnapshotStore>,
        metrics: Option<Duration>,
    ) -> RefreshScheduler {
        RefreshScheduler::new(
            mock.clone(),
            store.clone(),
            RefreshIntervals {
                metrics,
                resources: FAST,
            },
            SqlLimit::default(),
        )
    }

    #[tokio::test]
    async fn test_both_streams_publish() {
        let mock = Arc::new(MockCollector::new());
        let store = Arc::new(SnapshotStore::new());
        let mut sched = scheduler(&mock, &store, Some(FAST));

        sched.start();
        assert!(wait_for(&mock.resource_calls, 3).await);
        assert!(wait_for(&mock.metrics_calls, 2).await);
        sched.stop().await;

        assert!(store.metrics().version >= 1);
        assert!(store.resources().version >= 2);
        assert!(!sched.is_running());
    }

    #[tokio::test]
    async fn test_failure_keeps_last_good_snapshot() {
        let mock = Arc::new(MockCollector::new());
        mock.push_metrics(Ok(MetricsSnapshot {
            table_stats: vec![TableStatsRow {
                table_name: "EMP".into(),
                ..TableStatsRow::default()
            }],
            ..MetricsSnapshot::default()
        }));
        mock.push_metrics(Err(CollectorError::Status { status: 500 }));
        let store = Arc::new(SnapshotStore::new());
        let mut sched = scheduler(&mock, &store, None);

        sched.start();
        assert!(wait_for(&mock.metrics_calls, 1).await);
        sched.request_metrics();
        assert!(wait_for(&mock.metrics_calls, 2).await);
        for _ in 0..200 {
            if store.metrics().stale.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        sched.stop().await;

        let feed = store.metrics();
        assert_eq!(feed.version, 1);
        assert_eq!(
            feed.current
                .as_ref()
                .and_then(|s| s.table_stats.first())
                .map(|t| t.table_name.as_str()),
            Some("EMP")
        );
        assert_eq!(
            feed.stale.map(|s| s.message),
            Some("Request failed with status code 500".to_string())
        );
    }

    #[tokio::test]
    async fn test_loop_continues_after_error() {
        let mock = Arc::new(MockCollector::new());
        mock.push_resources(Err(CollectorError::Status { status: 503 }));
        mock.push_resources(Ok(SystemResourceSnapshot::default()));
        let store = Arc::new(SnapshotStore::new());
        let mut sched = scheduler(&mock, &store, None);

        sched.start();
        assert!(wait_for(&mock.resource_calls, 3).await);
        sched.stop().await;

        let feed = store.resources();
        assert!(feed.version >= 1);
        assert!(feed.stale.is_none());
    }

    #[tokio::test]
    async fn test_no_publish_after_stop() {
        let mock = Arc::new(MockCollector::new());
        let gate = mock.gate_resources();
        let store = Arc::new(SnapshotStore::new());
        let mut sched = scheduler(&mock, &store, None);

        sched.start();
        assert!(wait_for(&mock.resource_calls, 1).await);
        sched.stop().await;

        // the held request now resolves, but nobody is listening any more
        gate.notify_one();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(store.resources().version, 0);
        assert!(store.resources().stale.is_none());
        assert_eq!(MockCollector::count(&mock.resource_calls), 1);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mock = Arc::new(MockCollector::new());
        let store = Arc::new(SnapshotStore::new());
        let mut sched = scheduler(&mock, &store, None);

        sched.stop().await;
        sched.start();
        sched.stop().await;
        sched.stop().await;
        assert!(!sched.is_running());
    }

    #[tokio::test]
    async fn test_limit_change_triggers_metrics_fetch() {
        let mock = Arc::new(MockCollector::new());
        let store = Arc::new(SnapshotStore::new());
        let mut sched = scheduler(&mock, &store, None);

        sched.start();
        assert!(wait_for(&mock.metrics_calls, 1).await);
        sched.set_sql_limit(SqlLimit::default());
        sched.set_sql_limit(SqlLimit::All);
        assert!(wait_for(&mock.metrics_calls, 2).await);
        sched.stop().await;

        let limits = mock.limits.lock().map(|l| l.clone()).unwrap_or_default();
        assert_eq!(limits, [SqlLimit::default(), SqlLimit::All]);
    }
}
