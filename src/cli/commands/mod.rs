use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub mod built_info {
    #![allow(clippy::doc_markdown)]
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let git_hash = built_info::GIT_COMMIT_HASH.unwrap_or("unknown");
    let long_version: &'static str =
        Box::leak(format!("{} - {}", env!("CARGO_PKG_VERSION"), git_hash).into_boxed_str());

    Command::new("oramon")
        .about("An Oracle database monitoring TUI")
        .long_about("oramon is a terminal dashboard for an Oracle database instance. It polls a monitoring collector over HTTP for sessions, SQL activity, wait events, storage statistics and host resource usage, and lets you run read-only ad-hoc queries.")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .override_usage("oramon [OPTIONS] --url <URL>")
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .value_name("URL")
                .help("Collector base URL")
                .long_help("Base URL of the monitoring collector, e.g. http://localhost:5000. Read once at startup. May also be set in the config file.")
                .env("ORAMON_URL"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .help("Path to the YAML config file")
                .long_help("Read settings from this YAML file instead of the default <config dir>/oramon/config.yaml. Command line values and environment variables take precedence over the file.")
                .env("ORAMON_CONFIG"),
        )
        .arg(
            Arg::new("refresh-ms")
                .short('r')
                .long("refresh-ms")
                .value_name("u64")
                .help("System resources refresh interval in milliseconds")
                .long_help("Interval at which host CPU, memory and I/O readings are polled. The value must be between 1000ms and 60,000ms (1 minute).")
                .value_parser(clap::value_parser!(u64).range(1000..=60000))
                .default_value("5000"),
        )
        .arg(
            Arg::new("metrics-refresh-ms")
                .short('m')
                .long("metrics-refresh-ms")
                .value_name("u64")
                .help("Metrics refresh interval in milliseconds (0 = on demand)")
                .long_help("Interval at which the full metrics snapshot is polled. With 0 (the default) metrics are fetched at startup, when the Active SQL row limit changes, and when you press 'r'.")
                .value_parser(clap::value_parser!(u64).range(0..=3_600_000))
                .default_value("0"),
        )
        .arg(
            Arg::new("sql-limit")
                .short('l')
                .long("sql-limit")
                .value_name("ROWS")
                .help("Initial Active SQL row limit")
                .long_help("Number of SQL statements requested for the Active SQL view. One of 10, 25, 50, 100, 200, 500 or 'all'.")
                .value_parser(["10", "25", "50", "100", "200", "500", "all"])
                .default_value("50"),
        )
        .arg(
            Arg::new("home-view")
                .long("home-view")
                .value_name("VIEW")
                .help("Initial view on startup")
                .value_parser([
                    "overview",
                    "sessions",
                    "activesql",
                    "tablestats",
                    "sqlquery",
                    "performance",
                    "storage",
                    "resources",
                ])
                .default_value("overview"),
        )
        .arg(
            Arg::new("timeout-ms")
                .long("timeout-ms")
                .value_name("u64")
                .help("HTTP request timeout in milliseconds")
                .value_parser(clap::value_parser!(u64).range(100..=300_000))
                .default_value("30000"),
        )
        .arg(
            Arg::new("query")
                .short('q')
                .long("query")
                .value_name("SQL")
                .help("Run a single SELECT query, print the result and exit")
                .long_help("Execute one read-only query through the collector without starting the dashboard. Only SELECT statements are accepted by the collector.")
                .conflicts_with("ping"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .help("Output format for --query [default: table]")
                .value_parser(["table", "csv", "json"])
                .requires("query"),
        )
        .arg(
            Arg::new("ping")
                .long("ping")
                .action(ArgAction::SetTrue)
                .help("Check the collector and exit"),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .value_name("PATH")
                .help("Write dashboard logs to this file")
                .long_help("The dashboard owns the terminal, so its logs go to a file. Defaults to <cache dir>/oramon/oramon.log. Headless commands (--query, --ping) log to stderr."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Increase logging verbosity")
                .long_help("Increase the level of detail in the logs. Can be used multiple times (-vv, -vvv) to increase verbosity from INFO to DEBUG or TRACE."),
        )
}
