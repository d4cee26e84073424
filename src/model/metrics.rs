use chrono::NaiveDateTime;
use serde::Deserialize;
use std::borrow::Cow;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Status value the collector reports for sessions currently doing work.
pub const STATUS_ACTIVE: &str = "ACTIVE";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Full metrics snapshot as served by the collector's health endpoint.
///
/// Every sequence comes from the same capture; a snapshot is only ever
/// replaced as a whole, never patched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub database: DatabaseInfo,
    #[serde(default)]
    pub active_sessions: i64,
    #[serde(default)]
    pub total_sessions: i64,
    #[serde(default)]
    pub wait_events: Vec<WaitEventRow>,
    #[serde(default)]
    pub system_events: Vec<SystemEventRow>,
    #[serde(default)]
    pub sga_stats: Vec<SgaComponentRow>,
    #[serde(default)]
    pub tablespaces: Vec<TablespaceRow>,
    #[serde(default)]
    pub alerts: Vec<AlertRow>,
    #[serde(default)]
    pub long_running_sql: Vec<LongRunningSqlRow>,
    #[serde(default)]
    pub user_sessions: Vec<UserSessionRow>,
    #[serde(default)]
    pub session_details: Vec<SessionRow>,
    #[serde(default)]
    pub active_sql: Vec<ActiveSqlRow>,
    #[serde(default)]
    pub table_stats: Vec<TableStatsRow>,
}

impl MetricsSnapshot {
    /// Capture instant reported by the collector, if it parses.
    pub fn captured_at(&self) -> Option<NaiveDateTime> {
        parse_timestamp(self.timestamp.as_deref()?)
    }
}

/// Identity of the monitored database.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub open_mode: Option<String>,
    #[serde(default)]
    pub log_mode: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WaitEventRow {
    pub event: String,
    #[serde(default)]
    pub count: i64,
}

/// System-wide wait event aggregate. Times are in centiseconds.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SystemEventRow {
    pub event: String,
    #[serde(default)]
    pub total_waits: i64,
    #[serde(default)]
    pub total_timeouts: Option<i64>,
    #[serde(default)]
    pub time_waited: Option<f64>,
    #[serde(default)]
    pub avg_wait: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SgaComponentRow {
    pub component: String,
    #[serde(default)]
    pub size_mb: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TablespaceRow {
    pub name: String,
    #[serde(default)]
    pub pct_used: Option<f64>,
    #[serde(default)]
    pub used_mb: Option<f64>,
    #[serde(default)]
    pub total_mb: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertRow {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LongRunningSqlRow {
    pub sql_id: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub elapsed_sec: Option<f64>,
    #[serde(default)]
    pub cpu_sec: Option<f64>,
    #[serde(default)]
    pub buffer_gets: Option<i64>,
    #[serde(default)]
    pub disk_reads: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Sessions aggregated per (user, OS user, machine, program).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserSessionRow {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub osuser: Option<String>,
    #[serde(default)]
    pub machine: Option<String>,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub session_count: i64,
    #[serde(default)]
    pub active_count: i64,
    #[serde(default)]
    pub physical_reads: i64,
    #[serde(default)]
    pub block_gets: i64,
    #[serde(default)]
    pub consistent_gets: i64,
    #[serde(default)]
    pub cpu_sec: f64,
}

/// One row of the session registry.
///
/// `sid` may be reused by the database once a session ends; `serial`
/// tells the incarnations apart.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionRow {
    pub sid: i64,
    #[serde(default)]
    pub serial: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub osuser: Option<String>,
    #[serde(default)]
    pub machine: Option<String>,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub wait_sec: f64,
    #[serde(default)]
    pub logon_time: Option<String>,
    #[serde(default)]
    pub physical_reads: i64,
    #[serde(default)]
    pub block_gets: i64,
    #[serde(default)]
    pub cpu_sec: f64,
}

impl SessionRow {
    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }
}

/// Cumulative statistics for one cursor in the shared pool.
///
/// Counters only grow within one instance lifetime; a restart resets them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActiveSqlRow {
    pub sql_id: String,
    #[serde(default)]
    pub sql_text: Option<String>,
    #[serde(default)]
    pub executions: Option<i64>,
    #[serde(default)]
    pub elapsed_sec: f64,
    #[serde(default)]
    pub cpu_sec: f64,
    #[serde(default)]
    pub buffer_gets: i64,
    #[serde(default)]
    pub disk_reads: i64,
    #[serde(default)]
    pub rows_processed: i64,
    #[serde(default)]
    pub parsing_schema: Option<String>,
    #[serde(default)]
    pub last_user: Option<String>,
}

impl ActiveSqlRow {
    /// SQL text cut to `max_width` columns for table cells; `sql_text`
    /// itself is left untouched for the detail view.
    pub fn display_text(&self, max_width: usize) -> Cow<'_, str> {
        match self.sql_text.as_deref() {
            Some(text) => truncate_display(text, max_width),
            None => Cow::Borrowed("N/A"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableStatsRow {
    pub table_name: String,
    #[serde(default)]
    pub num_rows: i64,
    #[serde(default)]
    pub blocks: i64,
    #[serde(default)]
    pub avg_row_len: i64,
    /// `None` means the table was never analyzed.
    #[serde(default)]
    pub last_analyzed: Option<String>,
    #[serde(default)]
    pub tablespace: Option<String>,
}

impl TableStatsRow {
    pub fn is_analyzed(&self) -> bool {
        self.last_analyzed.is_some()
    }
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).ok()
}

/// Shorten `text` to at most `max_width` terminal columns, marking the cut
/// with `...`. Newlines are folded to spaces.
pub fn truncate_display(text: &str, max_width: usize) -> Cow<'_, str> {
    const ELLIPSIS: &str = "...";

    if !text.contains('\n') && text.width() <= max_width {
        return Cow::Borrowed(text);
    }

    let flat = text.replace('\n', " ");
    if flat.width() <= max_width {
        return Cow::Owned(flat);
    }

    let budget = max_width.saturating_sub(ELLIPSIS.len());
    let mut used = 0;
    let mut out = String::with_capacity(max_width);
    for c in flat.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str(ELLIPSIS);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_deserialize_partial_snapshot() {
        let body = r#"{
            "timestamp": "2025-03-01T10:15:30.123456",
            "database": {"name": "FREE", "open_mode": "READ WRITE", "log_mode": "NOARCHIVELOG"},
            "session_details": [
                {"sid": 100, "serial": 7, "username": null, "status": "ACTIVE", "wait_sec": 0}
            ],
            "table_stats": [
                {"table_name": "EMP", "num_rows": 14, "blocks": 5, "avg_row_len": 38,
                 "last_analyzed": null, "tablespace": "USERS"}
            ]
        }"#;

        let snapshot: MetricsSnapshot = serde_json::from_str(body).unwrap_or_default();
        assert_eq!(snapshot.database.name.as_deref(), Some("FREE"));
        assert_eq!(snapshot.session_details.len(), 1);
        assert!(snapshot.active_sql.is_empty());
        assert!(snapshot.session_details.first().is_some_and(SessionRow::is_active));
        assert!(!snapshot.table_stats.first().is_some_and(TableStatsRow::is_analyzed));
        assert!(snapshot.captured_at().is_some());
    }

    #[test]
    fn test_null_numerics_are_unknown() {
        let body = r#"{
            "system_events": [{"event": "db file sequential read", "total_waits": 3,
                               "time_waited": null, "avg_wait": null}],
            "sga_stats": [{"component": "Buffer Cache", "size_mb": null}],
            "tablespaces": [{"name": "USERS", "pct_used": null, "used_mb": null,
                             "total_mb": 100.0}],
            "long_running_sql": [{"sql_id": "a1", "elapsed_sec": null, "cpu_sec": null,
                                  "buffer_gets": null, "disk_reads": null}],
            "active_sql": [{"sql_id": "b2", "executions": null, "cpu_sec": 1.5}]
        }"#;

        let parsed = serde_json::from_str::<MetricsSnapshot>(body);
        assert!(parsed.is_ok());
        let snapshot = parsed.unwrap_or_default();

        let event = snapshot.system_events.first().cloned().unwrap_or_default();
        assert_eq!(event.time_waited, None);
        assert_eq!(event.avg_wait, None);
        assert_eq!(event.total_waits, 3);

        let sga = snapshot.sga_stats.first().cloned().unwrap_or_default();
        assert_eq!(sga.size_mb, None);

        let tablespace = snapshot.tablespaces.first().cloned().unwrap_or_default();
        assert_eq!(tablespace.pct_used, None);
        assert_eq!(tablespace.used_mb, None);
        assert_eq!(tablespace.total_mb, Some(100.0));

        let long = snapshot.long_running_sql.first().cloned().unwrap_or_default();
        assert_eq!(long.elapsed_sec, None);
        assert_eq!(long.cpu_sec, None);
        assert_eq!(long.buffer_gets, None);
        assert_eq!(long.disk_reads, None);

        let sql = snapshot.active_sql.first().cloned().unwrap_or_default();
        assert_eq!(sql.executions, None);
        assert!((sql.cpu_sec - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate_display("SELECT 1 FROM dual", 100), "SELECT 1 FROM dual");
    }

    #[test]
    fn test_truncate_long_text() {
        let text = "SELECT owner, table_name FROM dba_tables";
        let cut = truncate_display(text, 15);
        assert_eq!(cut, "SELECT owner...");
        assert!(cut.width() <= 15);
    }

    #[test]
    fn test_truncate_folds_newlines() {
        assert_eq!(truncate_display("SELECT *\nFROM dual", 40), "SELECT * FROM dual");
    }

    #[test]
    fn test_display_text_preserves_original() {
        let row = ActiveSqlRow {
            sql_id: "abc".into(),
            sql_text: Some("x".repeat(300)),
            ..ActiveSqlRow::default()
        };
        assert_eq!(row.display_text(100).len(), 100);
        assert_eq!(row.sql_text.as_deref().map(str::len), Some(300));

        let empty = ActiveSqlRow::default();
        assert_eq!(empty.display_text(100), "N/A");
    }
}
