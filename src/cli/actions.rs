use crate::cli::output::{self, OutputFormat};
use crate::collector::{Collector, HttpCollector};
use crate::monitor::{
    gateway::QueryGateway,
    scheduler::RefreshIntervals,
    view::{SqlLimit, Tab},
};
use crate::tui::app::App;
use anyhow::{Result, anyhow};
use std::{io::Write, sync::Arc, time::Duration};
use tracing::info;
use url::Url;

/// Startup settings after merging command line, environment and config
/// file. Read once; nothing re-reads them while running.
#[derive(Debug, Clone)]
pub struct Settings {
    pub url: Url,
    pub timeout: Duration,
    pub intervals: RefreshIntervals,
    pub sql_limit: SqlLimit,
    pub home_view: Tab,
}

impl Settings {
    pub fn collector(&self) -> Result<Arc<dyn Collector>> {
        Ok(Arc::new(HttpCollector::new(&self.url, self.timeout)?))
    }
}

#[derive(Debug)]
pub enum Action {
    Monitor {
        settings: Settings,
    },
    Query {
        settings: Settings,
        sql: String,
        format: OutputFormat,
    },
    Ping {
        settings: Settings,
    },
}

impl Action {
    pub fn execute(self) -> Result<()> {
        match self {
            Action::Monitor { settings } => {
                let mut app = App::new(settings)?;
                app.run()
            }
            Action::Query {
                settings,
                sql,
                format,
            } => runtime()?.block_on(run_query(&settings, &sql, format)),
            Action::Ping { settings } => runtime()?.block_on(run_ping(&settings)),
        }
    }
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

async fn run_query(settings: &Settings, sql: &str, format: OutputFormat) -> Result<()> {
    let gateway = QueryGateway::new(settings.collector()?);
    let result = gateway
        .execute(sql)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    output::write(&mut out, &result, format)?;
    out.flush()?;
    Ok(())
}

async fn run_ping(settings: &Settings) -> Result<()> {
    let collector = settings.collector()?;
    let ping = collector
        .ping()
        .await
        .map_err(|e| anyhow!(e.user_message()))?;
    info!(status = %ping.status, "collector answered ping");

    println!("Collector: {}", settings.url);
    println!("Status:    {}", ping.status);
    if let Some(database) = ping.database {
        println!("Database:  {database}");
    }
    if let Some(timestamp) = ping.timestamp {
        println!("Time:      {timestamp}");
    }
    Ok(())
}
