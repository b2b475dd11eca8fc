use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::matcher::{TargetNames, DEFAULT_RECEIVER};

/// Looked up at the project root when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "consolex.toml";

pub const DEFAULT_TYPES: &[&str] = &[
    "log", "error", "warn", "info", "debug", "table", "time", "timeEnd", "group", "groupEnd",
    "clear", "count", "trace",
];
pub const DEFAULT_EXTENSIONS: &[&str] = &["js", "ts", "jsx", "tsx"];
pub const DEFAULT_EXCLUDE: &[&str] = &["node_modules", "dist", "build", ".git"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Global object whose members are removed.
    pub receiver: String,
    /// Member names to remove.
    pub types: Vec<String>,
    /// File extensions to process, without the leading dot.
    pub extensions: Vec<String>,
    /// Directory names skipped anywhere in the tree.
    pub exclude: Vec<String>,
    /// Parse rewritten files again before writing them.
    pub verify_output: bool,
    pub dry_run: bool,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_owned()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            receiver: DEFAULT_RECEIVER.to_owned(),
            types: owned(DEFAULT_TYPES),
            extensions: owned(DEFAULT_EXTENSIONS),
            exclude: owned(DEFAULT_EXCLUDE),
            verify_output: true,
            dry_run: false,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `consolex.toml` from `root`, or the defaults when there is none.
    pub fn discover(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn targets(&self) -> TargetNames {
        self.types.iter().collect()
    }
}

/// Splits a comma separated flag value, dropping blank entries.
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}
