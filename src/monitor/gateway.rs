use std::sync::Arc;
use tracing::{debug, error, info};

use crate::collector::{Collector, CollectorError};
use crate::model::QueryResult;

pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a SQL query";

/// Submits ad-hoc queries to the collector.
///
/// Only SELECT statements are accepted. The collector enforces that and
/// answers anything else with an error, which is passed on unchanged; the
/// gateway itself does not parse SQL. One request per call, no caching,
/// no retries.
#[derive(Clone)]
pub struct QueryGateway {
    collector: Arc<dyn Collector>,
}

impl QueryGateway {
    pub fn new(collector: Arc<dyn Collector>) -> Self {
        Self { collector }
    }

    pub async fn execute(&self, query: &str) -> Result<QueryResult, CollectorError> {
        if query.trim().is_empty() {
            return Err(CollectorError::Validation(EMPTY_QUERY_MESSAGE.to_string()));
        }

        match self.collector.execute_query(query).await {
            Ok(result) => {
                info!(
                    rows = result.row_count(),
                    columns = result.columns().len(),
                    "query executed"
                );
                Ok(result)
            }
            Err(e) => {
                match &e {
                    CollectorError::Transport(inner) => {
                        error!(error = %inner, "query request could not reach collector");
                    }
                    other => debug!(error = %other, "query rejected"),
                }
                Err(e)
            }
        }
    }
}

/// Identifies one submission; only the newest one may update the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// State of the SQL query editor: text, last result or error.
///
/// Result and error are mutually exclusive. Submitting clears both, and a
/// failure never leaves an older result on screen next to the error.
#[derive(Debug, Default)]
pub struct QueryPanel {
    pub input: String,
    result: Option<QueryResult>,
    error: Option<String>,
    issued: u64,
    pending: Option<Ticket>,
}

impl QueryPanel {
    pub fn result(&self) -> Option<&QueryResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    /// Start a submission: clears the previous outcome.
    pub fn begin(&mut self) -> Ticket {
        self.issued += 1;
        let ticket = Ticket(self.issued);
        self.pending = Some(ticket);
        self.result = None;
        self.error = None;
        ticket
    }

    /// Apply the outcome of `ticket`. Outcomes of superseded submissions
    /// are dropped; returns whether this one was applied.
    pub fn finish(&mut self, ticket: Ticket, outcome: Result<QueryResult, CollectorError>) -> bool {
        if self.pending != Some(ticket) {
            debug!(?ticket, "dropping superseded query outcome");
            return false;
        }
        self.pending = None;
        match outcome {
            Ok(result) => {
                self.result = Some(result);
                self.error = None;
            }
            Err(e) => {
                self.result = None;
                self.error = Some(e.user_message());
            }
        }
        true
    }

    /// Reject locally without a ticket (e.g. empty input).
    pub fn fail(&mut self, message: String) {
        self.pending = None;
        self.result = None;
        self.error = Some(message);
    }

    /// Replace the editor text and forget the last outcome.
    pub fn load(&mut self, sql: &str) {
        self.input = sql.trim().to_string();
        self.result = None;
        self.error = None;
    }

    pub fn clear(&mut self) {
        self.load("");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockCollector;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn result(rows: &serde_json::Value) -> Option<QueryResult> {
        let data = rows
            .as_array()?
            .iter()
            .filter_map(|r| r.as_object().cloned())
            .collect::<Vec<_>>();
        let count = data.len();
        QueryResult::new(vec!["A".into()], data, Some(count)).ok()
    }

    #[tokio::test]
    async fn test_empty_query_rejected_locally() {
        let mock = Arc::new(MockCollector::new());
        let gateway = QueryGateway::new(mock.clone());

        for input in ["", "   \n\t"] {
            let outcome = gateway.execute(input).await;
            assert!(matches!(outcome, Err(CollectorError::Validation(_))));
        }
        assert_eq!(MockCollector::count(&mock.query_calls), 0);
    }

    #[tokio::test]
    async fn test_one_call_per_execute() {
        let mock = Arc::new(MockCollector::new());
        mock.push_query(Err(CollectorError::Status { status: 500 }));
        let gateway = QueryGateway::new(mock.clone());

        assert!(gateway.execute("SELECT 1 FROM dual").await.is_err());
        assert_eq!(MockCollector::count(&mock.query_calls), 1);
        assert!(gateway.execute("SELECT 1 FROM dual").await.is_ok());
        assert_eq!(MockCollector::count(&mock.query_calls), 2);
    }

    #[tokio::test]
    async fn test_null_rows_propagate() {
        let mock = Arc::new(MockCollector::new());
        if let Some(r) = result(&json!([{"A": 1}, {"A": null}])) {
            mock.push_query(Ok(r));
        }
        let gateway = QueryGateway::new(mock);

        let mut panel = QueryPanel::default();
        let ticket = panel.begin();
        let outcome = gateway.execute("SELECT a FROM t").await;
        assert!(panel.finish(ticket, outcome));

        let rows = panel.result().map(|r| r.rows().len());
        assert_eq!(rows, Some(2));
        let second = panel
            .result()
            .and_then(|r| r.rows().get(1))
            .map(|row| QueryResult::cell(row, "A").is_null());
        assert_eq!(second, Some(true));
    }

    #[tokio::test]
    async fn test_backend_error_clears_previous_result() {
        let mock = Arc::new(MockCollector::new());
        if let Some(r) = result(&json!([{"A": 1}])) {
            mock.push_query(Ok(r));
        }
        mock.push_query(Err(CollectorError::from_response(
            400,
            r#"{"error":"ORA-00942: table or view does not exist"}"#,
        )));
        let gateway = QueryGateway::new(mock);
        let mut panel = QueryPanel::default();

        let ticket = panel.begin();
        panel.finish(ticket, gateway.execute("SELECT a FROM t").await);
        assert!(panel.result().is_some());

        let ticket = panel.begin();
        panel.finish(ticket, gateway.execute("SELECT * FROM missing").await);
        assert!(panel.result().is_none());
        assert_eq!(panel.error(), Some("ORA-00942: table or view does not exist"));
    }

    #[test]
    fn test_transport_message_is_generic() {
        let mut panel = QueryPanel::default();
        let ticket = panel.begin();
        panel.finish(ticket, Err(CollectorError::Status { status: 503 }));
        assert_eq!(panel.error(), Some("Request failed with status code 503"));
        assert!(!panel.is_running());
    }

    #[test]
    fn test_superseded_outcome_dropped() {
        let mut panel = QueryPanel::default();
        let first = panel.begin();
        let second = panel.begin();

        assert!(!panel.finish(first, Err(CollectorError::Status { status: 500 })));
        assert!(panel.error().is_none());
        assert!(panel.is_running());

        let empty = QueryResult::new(Vec::new(), Vec::new(), Some(0)).ok();
        assert!(empty.is_some());
        if let Some(empty) = empty {
            assert!(panel.finish(second, Ok(empty)));
        }
        assert!(panel.result().is_some());
    }

    #[test]
    fn test_load_resets_outcome() {
        let mut panel = QueryPanel::default();
        panel.fail("boom".into());
        panel.load("  SELECT 1 FROM dual \n");
        assert_eq!(panel.input, "SELECT 1 FROM dual");
        assert!(panel.error().is_none());
    }
}
