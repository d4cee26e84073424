//! Seam to the HTTP collector that talks to the monitored database.

pub mod client;
pub mod error;
#[cfg(test)]
pub mod mock;
pub mod queries;

use async_trait::async_trait;
use serde::Deserialize;

use crate::model::{MetricsSnapshot, QueryResult, SystemResourceSnapshot};
use crate::monitor::view::SqlLimit;

pub use client::HttpCollector;
pub use error::CollectorError;

/// Answer of the collector's ping endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PingInfo {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
}

#[async_trait]
pub trait Collector: Send + Sync {
    /// Full metrics snapshot; `limit` caps the active-SQL list.
    async fn fetch_metrics(&self, limit: SqlLimit) -> Result<MetricsSnapshot, CollectorError>;

    /// Lightweight host/instance resource snapshot.
    async fn fetch_resources(&self) -> Result<SystemResourceSnapshot, CollectorError>;

    /// Forward `query` for execution. The collector only admits read-only
    /// SELECT statements and reports anything else as an error.
    async fn execute_query(&self, query: &str) -> Result<QueryResult, CollectorError>;

    async fn ping(&self) -> Result<PingInfo, CollectorError>;
}
