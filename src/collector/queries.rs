/// Ready-made read-only queries offered in the SQL editor.
pub struct ExampleQuery {
    pub name: &'static str,
    pub sql: &'static str,
}

pub const EXAMPLE_QUERIES: &[ExampleQuery] = &[
    ExampleQuery {
        name: "Active sessions",
        sql: ACTIVE_SESSIONS_QUERY,
    },
    ExampleQuery {
        name: "Instance statistics",
        sql: INSTANCE_STATS_QUERY,
    },
    ExampleQuery {
        name: "Top wait events",
        sql: WAIT_EVENTS_QUERY,
    },
    ExampleQuery {
        name: "Top SQL by elapsed time",
        sql: TOP_SQL_QUERY,
    },
    ExampleQuery {
        name: "SGA components",
        sql: SGA_QUERY,
    },
    ExampleQuery {
        name: "Tablespace usage",
        sql: TABLESPACE_QUERY,
    },
    ExampleQuery {
        name: "Table statistics",
        sql: TABLE_STATS_QUERY,
    },
    ExampleQuery {
        name: "Index statistics",
        sql: INDEX_STATS_QUERY,
    },
];

pub const ACTIVE_SESSIONS_QUERY: &str = r"
SELECT
    sid,
    serial#,
    username,
    status,
    program,
    machine,
    sql_id,
    last_call_et,
    logon_time
FROM v$session
WHERE status = 'ACTIVE'
  AND username IS NOT NULL
ORDER BY last_call_et DESC
";

pub const INSTANCE_STATS_QUERY: &str = r"
SELECT
    name,
    value
FROM v$sysstat
WHERE name IN (
    'user commits',
    'user rollbacks',
    'physical reads',
    'physical writes',
    'db block gets',
    'consistent gets',
    'redo size'
)
ORDER BY name
";

pub const WAIT_EVENTS_QUERY: &str = r"
SELECT
    event,
    total_waits,
    total_timeouts,
    time_waited,
    average_wait
FROM v$system_event
WHERE wait_class != 'Idle'
ORDER BY time_waited DESC
FETCH FIRST 10 ROWS ONLY
";

pub const TOP_SQL_QUERY: &str = r"
SELECT
    sql_id,
    executions,
    elapsed_time / 1000000 AS elapsed_sec,
    cpu_time / 1000000 AS cpu_sec,
    buffer_gets,
    disk_reads,
    rows_processed
FROM v$sql
WHERE executions > 0
ORDER BY elapsed_time DESC
FETCH FIRST 10 ROWS ONLY
";

pub const SGA_QUERY: &str = r"
SELECT
    name,
    ROUND(bytes / 1024 / 1024, 2) AS size_mb
FROM v$sgastat
WHERE name IN (
    'buffer_cache',
    'shared_pool',
    'large_pool',
    'java_pool',
    'log_buffer'
)
";

pub const TABLESPACE_QUERY: &str = r"
SELECT
    df.tablespace_name,
    ROUND(df.total_space / 1024 / 1024, 2) AS total_mb,
    ROUND((df.total_space - fs.free_space) / 1024 / 1024, 2) AS used_mb,
    ROUND(fs.free_space / 1024 / 1024, 2) AS free_mb,
    ROUND(((df.total_space - fs.free_space) / df.total_space) * 100, 2) AS pct_used
FROM
    (SELECT tablespace_name, SUM(bytes) AS total_space
     FROM dba_data_files
     GROUP BY tablespace_name) df,
    (SELECT tablespace_name, SUM(bytes) AS free_space
     FROM dba_free_space
     GROUP BY tablespace_name) fs
WHERE df.tablespace_name = fs.tablespace_name
ORDER BY pct_used DESC
";

pub const TABLE_STATS_QUERY: &str = r"
SELECT
    table_name,
    num_rows,
    blocks,
    avg_row_len,
    last_analyzed
FROM dba_tables
WHERE owner = USER
ORDER BY num_rows DESC NULLS LAST
";

pub const INDEX_STATS_QUERY: &str = r"
SELECT
    index_name,
    table_name,
    blevel,
    leaf_blocks,
    distinct_keys,
    clustering_factor,
    last_analyzed
FROM dba_indexes
WHERE owner = USER
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_examples_are_selects() {
        for example in EXAMPLE_QUERIES {
            assert!(
                example.sql.trim_start().starts_with("SELECT"),
                "{} is not a SELECT",
                example.name
            );
        }
    }
}
