use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::collector::{Collector, CollectorError, PingInfo};
use crate::model::{MetricsSnapshot, QueryResult, SystemResourceSnapshot};
use crate::monitor::view::SqlLimit;

type Scripted<T> = Mutex<VecDeque<Result<T, CollectorError>>>;

/// Collector for tests: replays scripted responses and counts calls.
///
/// When a script runs dry, fetches answer with a default snapshot and
/// queries with an empty result.
#[derive(Default)]
pub struct MockCollector {
    metrics: Scripted<MetricsSnapshot>,
    resources: Scripted<SystemResourceSnapshot>,
    queries: Scripted<QueryResult>,
    resource_gate: Mutex<Option<Arc<Notify>>>,
    pub metrics_calls: AtomicUsize,
    pub resource_calls: AtomicUsize,
    pub query_calls: AtomicUsize,
    pub limits: Mutex<Vec<SqlLimit>>,
}

fn push<T>(script: &Scripted<T>, item: Result<T, CollectorError>) {
    if let Ok(mut queue) = script.lock() {
        queue.push_back(item);
    }
}

fn pop<T>(script: &Scripted<T>) -> Option<Result<T, CollectorError>> {
    script.lock().ok().and_then(|mut queue| queue.pop_front())
}

impl MockCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_metrics(&self, item: Result<MetricsSnapshot, CollectorError>) {
        push(&self.metrics, item);
    }

    pub fn push_resources(&self, item: Result<SystemResourceSnapshot, CollectorError>) {
        push(&self.resources, item);
    }

    pub fn push_query(&self, item: Result<QueryResult, CollectorError>) {
        push(&self.queries, item);
    }

    /// Hold every resource fetch until the returned handle is notified.
    pub fn gate_resources(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        if let Ok(mut slot) = self.resource_gate.lock() {
            *slot = Some(gate.clone());
        }
        gate
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Collector for MockCollector {
    async fn fetch_metrics(&self, limit: SqlLimit) -> Result<MetricsSnapshot, CollectorError> {
        self.metrics_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut limits) = self.limits.lock() {
            limits.push(limit);
        }
        pop(&self.metrics).unwrap_or_else(|| Ok(MetricsSnapshot::default()))
    }

    async fn fetch_resources(&self) -> Result<SystemResourceSnapshot, CollectorError> {
        self.resource_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.resource_gate.lock().ok().and_then(|slot| slot.clone());
        if let Some(gate) = gate {
            gate.notified().await;
        }
        pop(&self.resources).unwrap_or_else(|| Ok(SystemResourceSnapshot::default()))
    }

    async fn execute_query(&self, _query: &str) -> Result<QueryResult, CollectorError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        pop(&self.queries).unwrap_or_else(|| {
            QueryResult::new(Vec::new(), Vec::new(), Some(0)).map_err(CollectorError::Contract)
        })
    }

    async fn ping(&self) -> Result<PingInfo, CollectorError> {
        Ok(PingInfo {
            status: "ok".into(),
            timestamp: None,
            database: Some("mock@localhost:1521/FREEPDB1".into()),
        })
    }
}
