//! Runtime configuration.
//!
//! Resolution order for every setting: command-line flag, then
//! `ledgersort.toml`, then a default under the platform data directory.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "ledgersort.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// JSON or TOML rule file, picked by extension.
    pub rules_path: PathBuf,
    /// Where imported batches are written.
    pub output_dir: PathBuf,
    pub database_path: PathBuf,
    /// First id handed out when a statement is imported.
    pub start_id: i64,
    /// Filter directive used when neither `RUST_LOG` nor `--verbose` is set.
    pub log_level: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    rules_path: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    database_path: Option<PathBuf>,
    start_id: Option<i64>,
    log_level: Option<String>,
}

impl Config {
    /// Defaults rooted at `data_dir`.
    pub fn with_data_dir(data_dir: &Path) -> Self {
        Self {
            rules_path: data_dir.join("rules.json"),
            output_dir: data_dir.join("batches"),
            database_path: data_dir.join("ledger.db"),
            start_id: 1,
            log_level: "info".to_string(),
        }
    }

    /// Loads `path` if given, otherwise the default config file when it exists.
    /// An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = Self::with_data_dir(&default_data_dir());
        match path {
            Some(path) => Self::load_file(path, defaults),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load_file(&path, defaults),
                _ => Ok(defaults),
            },
        }
    }

    fn load_file(path: &Path, defaults: Self) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or(Path::new(""));
        Self::parse(&content, base, defaults).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Relative paths in the file are taken relative to `base`.
    fn parse(content: &str, base: &Path, defaults: Self) -> Result<Self, toml::de::Error> {
        let raw: RawConfig = toml::from_str(content)?;
        let resolve = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };

        Ok(Self {
            rules_path: raw.rules_path.map(resolve).unwrap_or(defaults.rules_path),
            output_dir: raw.output_dir.map(resolve).unwrap_or(defaults.output_dir),
            database_path: raw.database_path.map(resolve).unwrap_or(defaults.database_path),
            start_id: raw.start_id.unwrap_or(defaults.start_id),
            log_level: raw.log_level.unwrap_or(defaults.log_level),
        })
    }
}

pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "ledgersort", "LedgerSort")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".ledgersort"))
}

pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "ledgersort", "LedgerSort")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
