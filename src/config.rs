//! Configuration loading and management.
//!
//! Configuration is loaded from multiple sources with the following precedence
//! (highest to lowest):
//!
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. `.crud-lineage.toml` in current directory
//! 4. `~/.config/crud-lineage/config.toml`
//! 5. Default values
//!
//! # Configuration File Format
//!
//! ```toml
//! [resolver]
//! dialect = "postgresql"   # generic, mysql, postgresql, sqlite, mssql
//! max_depth = 32
//! source = "mybatis"       # mybatis, plain
//!
//! [runtime]
//! workers = 8              # defaults to the number of cores
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `CRUD_LINEAGE_DIALECT` | SQL dialect |
//! | `CRUD_LINEAGE_MAX_DEPTH` | Nesting bound for CTEs and subqueries |
//! | `CRUD_LINEAGE_WORKERS` | Worker threads |

use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr
};

use serde::Deserialize;
use tracing::debug;

use crate::{
    error::{AppResult, config_error},
    preprocessor::SqlSource,
    query::SqlDialect,
    resolve::{DEFAULT_MAX_DEPTH, ResolverConfig}
};

pub const DIALECT_ENV: &str = "CRUD_LINEAGE_DIALECT";
pub const MAX_DEPTH_ENV: &str = "CRUD_LINEAGE_MAX_DEPTH";
pub const WORKERS_ENV: &str = "CRUD_LINEAGE_WORKERS";

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub resolver: ResolverSection,
    #[serde(default)]
    pub runtime:  RuntimeConfig
}

/// `[resolver]` section
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResolverSection {
    pub dialect:   SqlDialect,
    pub max_depth: usize,
    pub source:    SqlSource
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            dialect:   SqlDialect::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            source:    SqlSource::default()
        }
    }
}

impl ResolverSection {
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            max_depth: self.max_depth
        }
    }
}

/// `[runtime]` section
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Worker threads; `None` uses one per core
    pub workers: Option<usize>
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns error if a config file exists but cannot be read or decoded,
    /// or an environment variable holds an invalid value
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(home) = env::var_os("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("crud-lineage")
                .join("config.toml");
            if home_config.exists() {
                config = Self::from_file(&home_config)?;
            }
        }

        let local_config = PathBuf::from(".crud-lineage.toml");
        if local_config.exists() {
            config = Self::from_file(&local_config)?;
        }

        config.apply_env(|name| env::var(name).ok())?;
        Ok(config)
    }

    /// Read one TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not valid config
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| config_error(format!("Failed to read config file: {}", e)))?;
        debug!(path = %path.display(), "loaded config file");
        Self::from_toml(&content)
    }

    /// # Errors
    ///
    /// Returns error if the text is not valid config
    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| config_error(format!("Invalid config file: {}", e)))
    }

    /// Override values from environment variables, read through `lookup`
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set to an unparsable value
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> AppResult<()> {
        if let Some(dialect) = lookup(DIALECT_ENV) {
            self.resolver.dialect = dialect.parse()?;
        }
        if let Some(depth) = lookup(MAX_DEPTH_ENV) {
            self.resolver.max_depth = depth
                .trim()
                .parse()
                .map_err(|_| config_error(format!("{} must be a number, got '{}'", MAX_DEPTH_ENV, depth)))?;
        }
        if let Some(workers) = lookup(WORKERS_ENV) {
            let workers: usize = workers
                .trim()
                .parse()
                .map_err(|_| config_error(format!("{} must be a number, got '{}'", WORKERS_ENV, workers)))?;
            self.runtime.workers = (workers > 0).then_some(workers);
        }
        Ok(())
    }
}

impl FromStr for SqlDialect {
    type Err = crate::error::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generic" => Ok(Self::Generic),
            "mysql" => Ok(Self::MySQL),
            "postgresql" | "postgres" => Ok(Self::PostgreSQL),
            "sqlite" => Ok(Self::SQLite),
            "mssql" => Ok(Self::MsSql),
            other => Err(config_error(format!("Unknown SQL dialect '{}'", other)))
        }
    }
}
