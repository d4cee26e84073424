use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "oramon";
const CONFIG_FILENAME: &str = "config.yaml";

/// Settings read from the YAML config file. Every field is optional;
/// command line and environment values win over it.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub url: Option<String>,
    pub refresh_ms: Option<u64>,
    pub metrics_refresh_ms: Option<u64>,
    pub sql_limit: Option<LimitSetting>,
    pub home_view: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// `sql_limit: 100` and `sql_limit: all` are both accepted.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum LimitSetting {
    Rows(u32),
    Text(String),
}

impl LimitSetting {
    pub fn as_text(&self) -> String {
        match self {
            LimitSetting::Rows(n) => n.to_string(),
            LimitSetting::Text(s) => s.clone(),
        }
    }
}

/// `<config dir>/oramon/config.yaml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILENAME))
}

/// `<cache dir>/oramon/oramon.log`
pub fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join(APP_DIR).join("oramon.log"))
}

/// Load the config file. An explicitly named file must exist; the default
/// location is optional.
pub fn load(explicit: Option<&Path>) -> Result<FileConfig> {
    match explicit {
        Some(path) => read(path),
        None => match default_path() {
            Some(path) if path.exists() => read(&path),
            _ => Ok(FileConfig::default()),
        },
    }
}

fn read(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse(&content).with_context(|| format!("Invalid config file {}", path.display()))
}

pub fn parse(content: &str) -> Result<FileConfig> {
    if content.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    Ok(serde_yaml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_full_file() {
        let cfg = parse(
            "url: http://collector:5000\nrefresh_ms: 2000\nsql_limit: all\nhome_view: storage\n",
        )
        .unwrap_or_default();
        assert_eq!(cfg.url.as_deref(), Some("http://collector:5000"));
        assert_eq!(cfg.refresh_ms, Some(2000));
        assert_eq!(cfg.sql_limit.map(|l| l.as_text()), Some("all".to_string()));
        assert_eq!(cfg.home_view.as_deref(), Some("storage"));
        assert_eq!(cfg.metrics_refresh_ms, None);
    }

    #[test]
    fn test_numeric_limit() {
        let cfg = parse("sql_limit: 100").unwrap_or_default();
        assert_eq!(cfg.sql_limit, Some(LimitSetting::Rows(100)));
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(parse("").unwrap_or_default(), FileConfig::default());
        assert_eq!(parse("  \n").ok(), Some(FileConfig::default()));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(parse("urll: http://typo").is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        assert!(load(Some(Path::new("/nonexistent/oramon/config.yaml"))).is_err());
    }
}
