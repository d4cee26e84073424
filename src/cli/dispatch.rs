use crate::cli::{
    actions::{Action, Settings},
    config::{self, FileConfig},
    output::OutputFormat,
};
use crate::monitor::{
    scheduler::RefreshIntervals,
    view::{SqlLimit, Tab},
};
use anyhow::{Context, Result, anyhow, ensure};
use clap::{ArgMatches, parser::ValueSource};
use std::{path::PathBuf, time::Duration};
use url::Url;

const REFRESH_RANGE: std::ops::RangeInclusive<u64> = 1000..=60_000;
const METRICS_REFRESH_RANGE: std::ops::RangeInclusive<u64> = 0..=3_600_000;
const TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 100..=300_000;

pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let file = config::load(matches.get_one::<String>("config").map(PathBuf::from).as_deref())?;
    let settings = settings(matches, &file)?;

    if let Some(sql) = matches.get_one::<String>("query") {
        let format = matches
            .get_one::<String>("format")
            .and_then(|f| OutputFormat::parse(f))
            .unwrap_or_default();
        return Ok(Action::Query {
            settings,
            sql: sql.clone(),
            format,
        });
    }

    if matches.get_flag("ping") {
        return Ok(Action::Ping { settings });
    }

    Ok(Action::Monitor { settings })
}

/// Merge command line, environment and config file. Values given on the
/// command line or through the environment win; the file only replaces
/// built-in defaults.
fn settings(matches: &ArgMatches, file: &FileConfig) -> Result<Settings> {
    let url = explicit::<String>(matches, "url")
        .or_else(|| file.url.clone())
        .ok_or_else(|| {
            anyhow!("No collector URL given; use --url, ORAMON_URL or `url:` in the config file")
        })?;
    let url = Url::parse(&url).with_context(|| format!("Invalid collector URL: {url}"))?;
    ensure!(
        matches!(url.scheme(), "http" | "https"),
        "Collector URL must use http or https: {url}"
    );

    let refresh_ms = merged_ms(matches, "refresh-ms", file.refresh_ms, REFRESH_RANGE)?;
    let metrics_refresh_ms = merged_ms(
        matches,
        "metrics-refresh-ms",
        file.metrics_refresh_ms,
        METRICS_REFRESH_RANGE,
    )?;
    let timeout_ms = merged_ms(matches, "timeout-ms", file.timeout_ms, TIMEOUT_RANGE)?;

    let sql_limit = explicit::<String>(matches, "sql-limit")
        .or_else(|| file.sql_limit.as_ref().map(|l| l.as_text()))
        .or_else(|| matches.get_one::<String>("sql-limit").cloned())
        .unwrap_or_default();
    let sql_limit = if sql_limit.is_empty() {
        SqlLimit::default()
    } else {
        SqlLimit::parse(&sql_limit).ok_or_else(|| anyhow!("Invalid sql_limit: {sql_limit}"))?
    };

    let home_view = explicit::<String>(matches, "home-view")
        .or_else(|| file.home_view.clone())
        .or_else(|| matches.get_one::<String>("home-view").cloned())
        .unwrap_or_default();
    let home_view = if home_view.is_empty() {
        Tab::Overview
    } else {
        Tab::from_id(&home_view).ok_or_else(|| anyhow!("Unknown home view: {home_view}"))?
    };

    Ok(Settings {
        url,
        timeout: Duration::from_millis(timeout_ms),
        intervals: RefreshIntervals {
            metrics: (metrics_refresh_ms > 0).then(|| Duration::from_millis(metrics_refresh_ms)),
            resources: Duration::from_millis(refresh_ms),
        },
        sql_limit,
        home_view,
    })
}

/// Value set on the command line or via the environment, ignoring clap
/// defaults.
fn explicit<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> Option<T> {
    match matches.value_source(id) {
        Some(ValueSource::CommandLine | ValueSource::EnvVariable) => {
            matches.get_one::<T>(id).cloned()
        }
        _ => None,
    }
}

fn merged_ms(
    matches: &ArgMatches,
    id: &str,
    from_file: Option<u64>,
    range: std::ops::RangeInclusive<u64>,
) -> Result<u64> {
    if let Some(value) = explicit::<u64>(matches, id) {
        return Ok(value);
    }
    if let Some(value) = from_file {
        ensure!(
            range.contains(&value),
            "{id} in config file must be between {} and {}, got {value}",
            range.start(),
            range.end()
        );
        return Ok(value);
    }
    matches
        .get_one::<u64>(id)
        .copied()
        .ok_or_else(|| anyhow!("missing default for {id}"))
}
