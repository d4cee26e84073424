use chrono::{DateTime, Local};
use std::sync::Arc;
use tokio::sync::watch;

use crate::model::{MetricsSnapshot, SystemResourceSnapshot};

/// State of one data stream: the latest published snapshot, the one it
/// replaced, and the outcome of the most recent poll.
#[derive(Debug)]
pub struct Feed<T> {
    pub current: Option<Arc<T>>,
    pub previous: Option<Arc<T>>,
    /// Number of snapshots published so far.
    pub version: u64,
    pub published_at: Option<DateTime<Local>>,
    /// Set when the last poll failed; `current` still holds the last good
    /// snapshot.
    pub stale: Option<StaleData>,
}

/// A poll failed but the previous snapshot is still shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleData {
    pub message: String,
    pub since: DateTime<Local>,
}

impl<T> Default for Feed<T> {
    fn default() -> Self {
        Self {
            current: None,
            previous: None,
            version: 0,
            published_at: None,
            stale: None,
        }
    }
}

impl<T> Clone for Feed<T> {
    fn clone(&self) -> Self {
        Self {
            current: self.current.clone(),
            previous: self.previous.clone(),
            version: self.version,
            published_at: self.published_at,
            stale: self.stale.clone(),
        }
    }
}

impl<T> Feed<T> {
    /// Nothing published yet: the view is still loading.
    pub fn is_loading(&self) -> bool {
        self.current.is_none()
    }

    fn publish(&mut self, snapshot: T) {
        self.previous = self.current.replace(Arc::new(snapshot));
        self.version += 1;
        self.published_at = Some(Local::now());
        self.stale = None;
    }

    fn mark_stale(&mut self, message: String) {
        let since = self
            .stale
            .as_ref()
            .map_or_else(Local::now, |stale| stale.since);
        self.stale = Some(StaleData { message, since });
    }
}

/// Owner of the current metrics and system-resource snapshots.
///
/// Each stream has exactly one way in: a whole-snapshot publish (or a
/// stale mark). Readers get `Arc`s to immutable snapshots, so a reader
/// holds either the old snapshot or the new one, never a mix.
#[derive(Debug)]
pub struct SnapshotStore {
    metrics: watch::Sender<Feed<MetricsSnapshot>>,
    resources: watch::Sender<Feed<SystemResourceSnapshot>>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            metrics: watch::Sender::new(Feed::default()),
            resources: watch::Sender::new(Feed::default()),
        }
    }

    pub fn metrics(&self) -> Feed<MetricsSnapshot> {
        self.metrics.borrow().clone()
    }

    pub fn resources(&self) -> Feed<SystemResourceSnapshot> {
        self.resources.borrow().clone()
    }

    /// Latest metrics snapshot, if any.
    pub fn current_metrics(&self) -> Option<Arc<MetricsSnapshot>> {
        self.metrics.borrow().current.clone()
    }

    pub fn current_resources(&self) -> Option<Arc<SystemResourceSnapshot>> {
        self.resources.borrow().current.clone()
    }

    pub fn publish_metrics(&self, snapshot: MetricsSnapshot) {
        self.metrics.send_modify(|feed| feed.publish(snapshot));
    }

    pub fn publish_resources(&self, snapshot: SystemResourceSnapshot) {
        self.resources.send_modify(|feed| feed.publish(snapshot));
    }

    pub fn mark_metrics_stale(&self, message: String) {
        self.metrics.send_modify(|feed| feed.mark_stale(message));
    }

    pub fn mark_resources_stale(&self, message: String) {
        self.resources.send_modify(|feed| feed.mark_stale(message));
    }

    /// Change notifications for the metrics stream.
    pub fn subscribe_metrics(&self) -> watch::Receiver<Feed<MetricsSnapshot>> {
        self.metrics.subscribe()
    }

    pub fn subscribe_resources(&self) -> watch::Receiver<Feed<SystemResourceSnapshot>> {
        self.resources.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::metrics::{SessionRow, TableStatsRow};
    use pretty_assertions::assert_eq;

    fn snapshot(tag: i64) -> MetricsSnapshot {
        MetricsSnapshot {
            session_details: vec![SessionRow {
                sid: tag,
                ..SessionRow::default()
            }],
            table_stats: vec![TableStatsRow {
                table_name: format!("T{tag}"),
                num_rows: tag,
                ..TableStatsRow::default()
            }],
            ..MetricsSnapshot::default()
        }
    }

    fn tags(snapshot: &MetricsSnapshot) -> (Option<i64>, Option<i64>) {
        (
            snapshot.session_details.first().map(|s| s.sid),
            snapshot.table_stats.first().map(|t| t.num_rows),
        )
    }

    #[test]
    fn test_empty_store_is_loading() {
        let store = SnapshotStore::new();
        assert!(store.metrics().is_loading());
        assert!(store.resources().is_loading());
        assert_eq!(store.metrics().version, 0);
    }

    #[test]
    fn test_publish_replaces_whole_snapshot() {
        let store = SnapshotStore::new();
        store.publish_metrics(snapshot(1));
        let held = store.current_metrics();

        store.publish_metrics(snapshot(2));
        let feed = store.metrics();

        // A reader keeps a consistent view of the snapshot it grabbed.
        assert_eq!(held.as_deref().map(tags), Some((Some(1), Some(1))));
        assert_eq!(feed.current.as_deref().map(tags), Some((Some(2), Some(2))));
        assert_eq!(feed.previous.as_deref().map(tags), Some((Some(1), Some(1))));
        assert_eq!(feed.version, 2);
    }

    #[test]
    fn test_stale_keeps_last_good_snapshot() {
        let store = SnapshotStore::new();
        store.publish_metrics(snapshot(7));
        store.mark_metrics_stale("Request failed with status code 500".into());
        store.mark_metrics_stale("Unable to reach the monitoring collector".into());

        let feed = store.metrics();
        assert_eq!(feed.current.as_deref().map(tags), Some((Some(7), Some(7))));
        assert_eq!(feed.version, 1);
        assert_eq!(
            feed.stale.as_ref().map(|s| s.message.as_str()),
            Some("Unable to reach the monitoring collector")
        );

        store.publish_metrics(snapshot(8));
        assert!(store.metrics().stale.is_none());
    }

    #[test]
    fn test_streams_are_independent() {
        let store = SnapshotStore::new();
        store.publish_resources(SystemResourceSnapshot::default());
        assert!(store.metrics().is_loading());
        assert_eq!(store.resources().version, 1);
        assert!(store.current_resources().is_some());
    }

    #[test]
    fn test_subscribers_see_publish() {
        let store = SnapshotStore::new();
        let mut rx = store.subscribe_metrics();
        store.publish_metrics(snapshot(3));
        assert!(rx.has_changed().unwrap_or(false));
        assert_eq!(rx.borrow_and_update().version, 1);
    }
}
