//! Derived per-view summaries.
//!
//! Everything here is a pure function of a snapshot (or a slice of one):
//! nothing suspends, nothing mutates its input, and an empty input yields
//! an empty output.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::model::metrics::{
    ActiveSqlRow, MetricsSnapshot, SessionRow, SystemEventRow, TableStatsRow, TablespaceRow,
    UserSessionRow,
};
use crate::model::resources::{CpuStats, IoStats, MemoryStats};

/// Group label used when a row has no key.
pub const UNKNOWN_GROUP: &str = "UNKNOWN";

pub const LEADERBOARD_SIZE: usize = 10;
pub const USER_DISTRIBUTION_SIZE: usize = 8;
pub const SCATTER_SIZE: usize = 20;
pub const SYSTEM_EVENTS_SIZE: usize = 8;

/// The `n` rows with the largest `metric`, largest first. Rows with equal
/// metric keep their original relative order.
pub fn top_n<T, F>(rows: &[T], n: usize, metric: F) -> Vec<&T>
where
    F: Fn(&T) -> f64,
{
    let mut keyed: Vec<(f64, &T)> = rows.iter().map(|row| (metric(row), row)).collect();
    // stable sort: ties stay in input order
    keyed.sort_by(|a, b| b.0.total_cmp(&a.0));
    keyed.into_iter().take(n).map(|(_, row)| row).collect()
}

/// Ranking key for a reading the collector may not know; unknown sorts last.
fn ranked(value: Option<f64>) -> f64 {
    value.unwrap_or(f64::NEG_INFINITY)
}

/// Count rows per key, groups listed in first-seen order.
pub fn group_count<T, K, F>(rows: &[T], key: F) -> Vec<(K, usize)>
where
    K: Eq + Hash + Clone,
    F: Fn(&T) -> K,
{
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, usize)> = Vec::new();
    for row in rows {
        let k = key(row);
        if let Some(group) = slots.get(&k).and_then(|&i| groups.get_mut(i)) {
            group.1 += 1;
        } else {
            slots.insert(k.clone(), groups.len());
            groups.push((k, 1));
        }
    }
    groups
}

/// First row per key, in input order; later duplicates are dropped.
pub fn dedup_by_key<T, K, F>(rows: &[T], key: F) -> Vec<&T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    rows.iter().filter(|row| seen.insert(key(row))).collect()
}

/// One point of a correlation/bubble chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalePoint<'a, T> {
    pub row: &'a T,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Project the first `n` rows into (x, y, z) points.
pub fn scale_pairs<'a, T, X, Y, Z>(
    rows: &'a [T],
    n: usize,
    x: X,
    y: Y,
    z: Z,
) -> Vec<ScalePoint<'a, T>>
where
    X: Fn(&T) -> f64,
    Y: Fn(&T) -> f64,
    Z: Fn(&T) -> f64,
{
    rows.iter()
        .take(n)
        .map(|row| ScalePoint {
            row,
            x: x(row),
            y: y(row),
            z: z(row),
        })
        .collect()
}

// ---- view summaries ----

/// Active sessions, one per sid.
///
/// Keys on sid alone: two incarnations sharing a reused sid collapse into
/// the first one listed.
pub fn active_sessions(snapshot: &MetricsSnapshot) -> Vec<&SessionRow> {
    let active: Vec<&SessionRow> = snapshot
        .session_details
        .iter()
        .filter(|s| s.is_active())
        .collect();
    let unique: Vec<&SessionRow> = dedup_by_key(&active, |s| s.sid)
        .into_iter()
        .copied()
        .collect();
    unique
}

#[allow(clippy::cast_precision_loss)]
pub fn top_users_by_sessions(snapshot: &MetricsSnapshot, n: usize) -> Vec<&UserSessionRow> {
    top_n(&snapshot.user_sessions, n, |u| u.session_count as f64)
}

pub fn top_sql_by_cpu(snapshot: &MetricsSnapshot, n: usize) -> Vec<&ActiveSqlRow> {
    top_n(&snapshot.active_sql, n, |s| s.cpu_sec)
}

#[allow(clippy::cast_precision_loss)]
pub fn top_sql_by_executions(snapshot: &MetricsSnapshot, n: usize) -> Vec<&ActiveSqlRow> {
    top_n(&snapshot.active_sql, n, |s| ranked(s.executions.map(|e| e as f64)))
}

/// Executions vs CPU, bubble size = elapsed time. Statements with an
/// unknown execution count are left off the chart.
#[allow(clippy::cast_precision_loss)]
pub fn sql_scatter(snapshot: &MetricsSnapshot) -> Vec<ScalePoint<'_, ActiveSqlRow>> {
    let mut points = scale_pairs(
        &snapshot.active_sql,
        SCATTER_SIZE,
        |s| s.executions.unwrap_or_default() as f64,
        |s| s.cpu_sec,
        |s| s.elapsed_sec,
    );
    points.retain(|p| p.row.executions.is_some());
    points
}

#[allow(clippy::cast_precision_loss)]
pub fn top_tables_by_rows(snapshot: &MetricsSnapshot, n: usize) -> Vec<&TableStatsRow> {
    top_n(&snapshot.table_stats, n, |t| t.num_rows as f64)
}

#[allow(clippy::cast_precision_loss)]
pub fn top_tables_by_blocks(snapshot: &MetricsSnapshot, n: usize) -> Vec<&TableStatsRow> {
    top_n(&snapshot.table_stats, n, |t| t.blocks as f64)
}

/// Number of tables per tablespace.
pub fn tablespace_distribution(snapshot: &MetricsSnapshot) -> Vec<(String, usize)> {
    group_count(&snapshot.table_stats, |t| {
        t.tablespace
            .clone()
            .unwrap_or_else(|| UNKNOWN_GROUP.to_string())
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableTotals {
    pub tables: usize,
    pub rows: i64,
    pub blocks: i64,
    pub analyzed: usize,
    /// Share of analyzed tables; `None` when there are no tables.
    pub analyzed_pct: Option<f64>,
}

#[allow(clippy::cast_precision_loss)]
pub fn table_totals(snapshot: &MetricsSnapshot) -> TableTotals {
    let tables = snapshot.table_stats.len();
    let analyzed = snapshot
        .table_stats
        .iter()
        .filter(|t| t.is_analyzed())
        .count();
    TableTotals {
        tables,
        rows: snapshot.table_stats.iter().map(|t| t.num_rows).sum(),
        blocks: snapshot.table_stats.iter().map(|t| t.blocks).sum(),
        analyzed,
        analyzed_pct: (tables > 0).then(|| analyzed as f64 / tables as f64 * 100.0),
    }
}

/// System event with wait times converted to milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct EventTiming<'a> {
    pub event: &'a SystemEventRow,
    pub time_waited_ms: Option<f64>,
    pub avg_wait_ms: Option<f64>,
}

/// Top system events by total time waited. The collector reports
/// centiseconds.
pub fn top_system_events(snapshot: &MetricsSnapshot, n: usize) -> Vec<EventTiming<'_>> {
    top_n(&snapshot.system_events, n, |e| ranked(e.time_waited))
        .into_iter()
        .map(|event| EventTiming {
            event,
            time_waited_ms: event.time_waited.map(|t| t * 10.0),
            avg_wait_ms: event.avg_wait.map(|a| a * 10.0),
        })
        .collect()
}

/// Tablespaces, fullest first; unknown usage last.
pub fn tablespaces_by_usage(snapshot: &MetricsSnapshot) -> Vec<&TablespaceRow> {
    top_n(&snapshot.tablespaces, snapshot.tablespaces.len(), |t| {
        ranked(t.pct_used)
    })
}

/// An SGA pool and its share of the total SGA.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolShare<'a> {
    pub pool: &'a str,
    pub size_mb: f64,
    /// `None` when the total SGA size is unknown or zero.
    pub pct: Option<f64>,
}

pub fn sga_pool_shares(memory: &MemoryStats) -> Vec<PoolShare<'_>> {
    let total = memory.total_sga_mb.filter(|t| *t > 0.0);
    memory
        .sga_pools
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|p| PoolShare {
            pool: &p.pool,
            size_mb: p.size_mb,
            pct: total.map(|t| p.size_mb / t * 100.0),
        })
        .collect()
}

/// Read and write shares of physical I/O requests, in percent.
pub fn io_split(io: &IoStats) -> Option<(f64, f64)> {
    let reads = io.physical_reads_per_sec?;
    let writes = io.physical_writes_per_sec?;
    let total = (reads + writes).max(1.0);
    Some((
        (reads / total * 100.0).min(100.0),
        (writes / total * 100.0).min(100.0),
    ))
}

/// DB CPU and background CPU as a share of DB time, in percent.
pub fn cpu_breakdown(cpu: &CpuStats) -> Option<(f64, Option<f64>)> {
    let db_time = cpu.db_time_sec?.max(1.0);
    let db_cpu = cpu.db_cpu_time_sec? / db_time * 100.0;
    let background = cpu.background_cpu_time_sec.map(|b| b / db_time * 100.0);
    Some((db_cpu, background))
}
