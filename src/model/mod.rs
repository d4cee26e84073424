pub mod metrics;
pub mod query;
pub mod resources;

pub use metrics::MetricsSnapshot;
pub use query::QueryResult;
pub use resources::SystemResourceSnapshot;
