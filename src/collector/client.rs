use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::collector::{Collector, CollectorError, PingInfo};
use crate::model::query::QueryResponse;
use crate::model::{MetricsSnapshot, QueryResult, SystemResourceSnapshot};
use crate::monitor::view::SqlLimit;

pub const METRICS_PATH: &str = "api/health";
pub const RESOURCES_PATH: &str = "api/system-resources";
pub const EXECUTE_QUERY_PATH: &str = "api/execute-query";
pub const PING_PATH: &str = "api/ping";

/// `reqwest` client bound to one collector base URL.
#[derive(Debug, Clone)]
pub struct HttpCollector {
    client: reqwest::Client,
    base: Url,
}

impl HttpCollector {
    pub fn new(base: &Url, timeout: Duration) -> Result<Self, CollectorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("oramon/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base: normalize_base(base),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, CollectorError> {
        self.base
            .join(path)
            .map_err(|e| CollectorError::Contract(format!("invalid endpoint {path}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, CollectorError> {
        let response = self.client.get(url).send().await?;
        let response = Self::ensure_success(response).await?;
        decode(response).await
    }

    /// Pass 2xx responses through; turn anything else into a typed error
    /// built from the body.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, CollectorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(CollectorError::from_response(status.as_u16(), &body))
    }
}

/// Parse a 2xx body. A body that does not match the expected shape is a
/// contract failure, not a transport one.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, CollectorError> {
    response.json::<T>().await.map_err(|e| {
        if e.is_decode() {
            CollectorError::Contract(format!("invalid response body: {e}"))
        } else {
            CollectorError::Transport(e)
        }
    })
}

/// `Url::join` drops the last path segment unless the base ends with `/`.
fn normalize_base(base: &Url) -> Url {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

#[async_trait]
impl Collector for HttpCollector {
    #[instrument(skip(self, limit), fields(sql_limit = limit.value()))]
    async fn fetch_metrics(&self, limit: SqlLimit) -> Result<MetricsSnapshot, CollectorError> {
        let mut url = self.endpoint(METRICS_PATH)?;
        url.query_pairs_mut()
            .append_pair("sql_limit", &limit.value().to_string());
        let snapshot: MetricsSnapshot = self.get_json(url).await?;
        debug!(
            sessions = snapshot.session_details.len(),
            active_sql = snapshot.active_sql.len(),
            tables = snapshot.table_stats.len(),
            "metrics fetched"
        );
        Ok(snapshot)
    }

    #[instrument(skip(self))]
    async fn fetch_resources(&self) -> Result<SystemResourceSnapshot, CollectorError> {
        let url = self.endpoint(RESOURCES_PATH)?;
        self.get_json(url).await
    }

    #[instrument(skip(self, query), fields(len = query.len()))]
    async fn execute_query(&self, query: &str) -> Result<QueryResult, CollectorError> {
        let url = self.endpoint(EXECUTE_QUERY_PATH)?;
        let body = serde_json::json!({ "query": query });
        let response = self.client.post(url).json(&body).send().await?;
        let response = Self::ensure_success(response).await?;
        let status = response.status().as_u16();
        let payload: QueryResponse = decode(response).await?;

        if let Some(message) = payload.error {
            return Err(CollectorError::Backend { status, message });
        }
        QueryResult::new(payload.columns, payload.data, payload.row_count)
            .map_err(CollectorError::Contract)
    }

    async fn ping(&self) -> Result<PingInfo, CollectorError> {
        let url = self.endpoint(PING_PATH)?;
        self.get_json(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::query::CellValue;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn collector(base: &str) -> Option<HttpCollector> {
        let base = Url::parse(base).ok()?;
        HttpCollector::new(&base, Duration::from_secs(1)).ok()
    }

    /// Serve one canned HTTP response on a local port and return its base URL.
    async fn serve_once(status: &'static str, body: &'static str) -> Option<Url> {
        let listener = TcpListener::bind("127.0.0.1:0").await.ok()?;
        let addr = listener.local_addr().ok()?;
        tokio::spawn(async move {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            if socket.write_all(response.as_bytes()).await.is_ok() {
                let _ = socket.shutdown().await;
            }
        });
        Url::parse(&format!("http://{addr}")).ok()
    }

    /// Consume the request head and any body announced by Content-Length.
    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            buf.extend_from_slice(chunk.get(..n).unwrap_or_default());
            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(buf.get(..end).unwrap_or_default())
                .to_ascii_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                return;
            }
        }
    }

    async fn query_against(
        status: &'static str,
        body: &'static str,
    ) -> Option<Result<QueryResult, CollectorError>> {
        let base = serve_once(status, body).await?;
        let c = HttpCollector::new(&base, Duration::from_secs(5)).ok()?;
        Some(c.execute_query("SELECT * FROM missing").await)
    }

    #[test]
    fn test_endpoint_joins_below_base_path() {
        let c = collector("http://collector:5000/monitor");
        assert!(c.is_some());
        let Some(c) = c else { return };
        let url = c.endpoint(METRICS_PATH).map(|u| u.to_string()).unwrap_or_default();
        assert_eq!(url, "http://collector:5000/monitor/api/health");
    }

    #[test]
    fn test_endpoint_root_base() {
        let c = collector("http://localhost:5000");
        assert!(c.is_some());
        let Some(c) = c else { return };
        assert_eq!(c.base.as_str(), "http://localhost:5000/");
        let url = c
            .endpoint(EXECUTE_QUERY_PATH)
            .map(|u| u.to_string())
            .unwrap_or_default();
        assert_eq!(url, "http://localhost:5000/api/execute-query");
    }

    #[tokio::test]
    async fn test_error_status_with_body_is_backend() {
        let result = query_against(
            "400 Bad Request",
            r#"{"error":"ORA-00942: table or view does not exist"}"#,
        )
        .await;
        assert!(result.is_some());
        let Some(Err(err)) = result else { return };
        assert!(matches!(err, CollectorError::Backend { status: 400, .. }));
        assert_eq!(err.user_message(), "ORA-00942: table or view does not exist");
    }

    #[tokio::test]
    async fn test_error_status_without_json_is_status() {
        let result = query_against("502 Bad Gateway", "<html>Bad Gateway</html>").await;
        assert!(result.is_some());
        let Some(Err(err)) = result else { return };
        assert!(matches!(err, CollectorError::Status { status: 502 }));
        assert_eq!(err.user_message(), "Request failed with status code 502");
    }

    #[tokio::test]
    async fn test_success_status_with_error_is_backend() {
        let result = query_against(
            "200 OK",
            r#"{"error":"Only SELECT queries are allowed"}"#,
        )
        .await;
        assert!(result.is_some());
        let Some(Err(err)) = result else { return };
        assert!(matches!(err, CollectorError::Backend { status: 200, .. }));
        assert_eq!(err.user_message(), "Only SELECT queries are allowed");
    }

    #[tokio::test]
    async fn test_row_count_mismatch_is_contract() {
        let result = query_against(
            "200 OK",
            r#"{"columns":["A"],"data":[{"A":1}],"row_count":3}"#,
        )
        .await;
        assert!(result.is_some());
        let Some(Err(err)) = result else { return };
        assert!(matches!(err, CollectorError::Contract(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_contract() {
        let result = query_against("200 OK", r#"{"columns":"A","data":7}"#).await;
        assert!(result.is_some());
        let Some(Err(err)) = result else { return };
        assert!(matches!(err, CollectorError::Contract(_)));
        assert!(err.user_message().contains("invalid response body"));
    }

    #[tokio::test]
    async fn test_query_keeps_null_cells() {
        let result = query_against(
            "200 OK",
            r#"{"columns":["A"],"data":[{"A":1},{"A":null}],"row_count":2}"#,
        )
        .await;
        assert!(result.is_some());
        let Some(Ok(result)) = result else { return };
        assert_eq!(result.row_count(), 2);
        let cells: Vec<bool> = result
            .rows()
            .iter()
            .map(|row| QueryResult::cell(row, "A").is_null())
            .collect();
        assert_eq!(cells, [false, true]);
        let second = result.rows().get(1).map(|row| QueryResult::cell(row, "A"));
        assert_eq!(second, Some(CellValue::Null));
    }

    #[tokio::test]
    async fn test_null_tablespace_usage_is_accepted() {
        let base = serve_once(
            "200 OK",
            r#"{"tablespaces":[{"name":"USERS","pct_used":null,"used_mb":null,"total_mb":50.0}]}"#,
        )
        .await;
        assert!(base.is_some());
        let Some(base) = base else { return };
        let c = HttpCollector::new(&base, Duration::from_secs(5));
        assert!(c.is_ok());
        let Ok(c) = c else { return };

        let snapshot = c.fetch_metrics(SqlLimit::default()).await;
        assert!(snapshot.is_ok());
        let Ok(snapshot) = snapshot else { return };
        let usage = snapshot.tablespaces.first().map(|t| (t.pct_used, t.total_mb));
        assert_eq!(usage, Some((None, Some(50.0))));
    }

    #[tokio::test]
    async fn test_garbage_metrics_body_is_contract() {
        let base = serve_once("200 OK", "not json").await;
        assert!(base.is_some());
        let Some(base) = base else { return };
        let c = HttpCollector::new(&base, Duration::from_secs(5));
        assert!(c.is_ok());
        let Ok(c) = c else { return };

        let err = c.fetch_metrics(SqlLimit::default()).await.err();
        assert!(matches!(err, Some(CollectorError::Contract(_))));
    }
}
