//! Configuration management with layered hierarchy

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::encoding::DEFAULT_ENCODINGS;
use crate::core::metafield::{MetafieldError, MetafieldTable};
use crate::core::stream::DEFAULT_MAX_RECORD_LINES;

/// Default shard size for `rts split` (20 MiB)
pub const DEFAULT_SPLIT_BYTES: usize = 20 * 1024 * 1024;

/// Project-local config file, looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "rts.yaml";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    #[diagnostic(code(rts::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {message}")]
    #[diagnostic(code(rts::config::parse))]
    Parse { path: PathBuf, message: String },
}

/// rts configuration with layered hierarchy
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Vendor written on every product row
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,

    /// Base URL that relative image paths are joined onto
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base: Option<String>,

    /// Target shard size for `rts split`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_bytes: Option<usize>,

    /// Physical line cap for a single logical record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_record_lines: Option<usize>,

    /// Input decode order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encodings: Option<Vec<String>>,

    /// YAML file with extra attribute → metafield entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metafield_map: Option<PathBuf>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    ///
    /// Unreadable global or local files are skipped silently.
    pub fn load() -> Self {
        let mut config = Config::default();

        // 1. Global user config (~/.config/rts/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Ok(global) = Self::from_file(&global_path) {
                config.merge(global);
            }
        }

        // 2. Local config (./rts.yaml)
        let local_path = Path::new(LOCAL_CONFIG_FILE);
        if local_path.exists() {
            if let Ok(local) = Self::from_file(local_path) {
                config.merge(local);
            }
        }

        // 3. Environment variables
        config.merge(Self::from_env());

        config
    }

    /// Like [`Config::load`], with an explicit file layered on top
    ///
    /// An explicit file that cannot be read or parsed is an error.
    pub fn load_with(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::load();
        if let Some(path) = explicit {
            config.merge(Self::from_file(path)?);
            // env vars still win over files
            config.merge(Self::from_env());
        }
        Ok(config)
    }

    /// Parse a single config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = serde_yml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        // relative mapping paths are relative to the config file
        if let Some(map) = config.metafield_map.take() {
            config.metafield_map = Some(match path.parent() {
                Some(dir) if map.is_relative() => dir.join(map),
                _ => map,
            });
        }
        Ok(config)
    }

    fn from_env() -> Self {
        let mut config = Config::default();
        if let Ok(vendor) = std::env::var("RTS_VENDOR") {
            config.vendor = Some(vendor);
        }
        if let Ok(base) = std::env::var("RTS_IMAGE_BASE") {
            config.image_base = Some(base);
        }
        if let Ok(bytes) = std::env::var("RTS_SPLIT_BYTES") {
            match bytes.trim().parse() {
                Ok(n) => config.split_bytes = Some(n),
                Err(_) => tracing::warn!(value = %bytes, "ignoring invalid RTS_SPLIT_BYTES"),
            }
        }
        config
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "rts")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        if other.vendor.is_some() {
            self.vendor = other.vendor;
        }
        if other.image_base.is_some() {
            self.image_base = other.image_base;
        }
        if other.split_bytes.is_some() {
            self.split_bytes = other.split_bytes;
        }
        if other.max_record_lines.is_some() {
            self.max_record_lines = other.max_record_lines;
        }
        if other.encodings.is_some() {
            self.encodings = other.encodings;
        }
        if other.metafield_map.is_some() {
            self.metafield_map = other.metafield_map;
        }
    }

    pub fn vendor(&self) -> String {
        self.vendor.clone().unwrap_or_default()
    }

    pub fn split_bytes(&self) -> usize {
        self.split_bytes.unwrap_or(DEFAULT_SPLIT_BYTES)
    }

    pub fn max_record_lines(&self) -> usize {
        self.max_record_lines.unwrap_or(DEFAULT_MAX_RECORD_LINES)
    }

    pub fn encodings(&self) -> Vec<String> {
        self.encodings
            .clone()
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| DEFAULT_ENCODINGS.iter().map(|s| s.to_string()).collect())
    }

    /// Copy with defaults filled in for every key that has one
    pub fn resolved(&self) -> Config {
        Config {
            split_bytes: Some(self.split_bytes()),
            max_record_lines: Some(self.max_record_lines()),
            encodings: Some(self.encodings()),
            ..self.clone()
        }
    }

    /// Built-in metafield table extended with the configured mapping file
    pub fn metafield_table(&self) -> Result<MetafieldTable, MetafieldError> {
        let mut table = MetafieldTable::builtin();
        if let Some(ref path) = self.metafield_map {
            let added = table.extend_from_yaml(path)?;
            tracing::debug!(path = %path.display(), entries = added, "loaded metafield mapping");
        }
        Ok(table)
    }
}
