use crate::cli::{
    commands, config, dispatch,
    telemetry::{self, LogTarget},
};
use anyhow::Result;
use std::path::PathBuf;

pub fn run() -> Result<()> {
    let matches = commands::new().get_matches();

    let verbosity = matches.get_count("verbose");
    let headless = matches.contains_id("query") || matches.get_flag("ping");
    let target = if headless {
        LogTarget::Stderr
    } else {
        matches
            .get_one::<String>("log-file")
            .map(PathBuf::from)
            .or_else(config::default_log_path)
            .map_or(LogTarget::Stderr, LogTarget::File)
    };
    telemetry::init(verbosity, &target)?;

    let action = dispatch::handler(&matches)?;
    action.execute()
}
