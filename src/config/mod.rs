//! Configuration surface consumed by the table monitor and partitioner.
//!
//! Loaded from layered sources with priority:
//! 1. Hardcoded field defaults
//! 2. Optional config file
//! 3. Environment variables with the `TABLEWATCH_` prefix (highest)


use std::path::Path;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// How often the external store is polled for table changes, in
    /// milliseconds. Must be greater than zero.
    #[serde(default = "default_table_poll_interval_ms")]
    pub table_poll_interval_ms: u64,

    /// Tables to copy. Entries match a table's quoted or unquoted
    /// fully-qualified name or its bare name.
    /// Mutually exclusive with `table_denylist`.
    #[serde(default)]
    pub table_allowlist: Vec<String>,

    /// Tables to skip; everything else is copied.
    /// Mutually exclusive with `table_allowlist`.
    #[serde(default)]
    pub table_denylist: Vec<String>,

    /// Free-form query replacing whole-table copying. When non-empty,
    /// exactly one task is configured and no tables are monitored for it.
    /// May not be combined with either table list.
    #[serde(default)]
    pub query: String,

    /// Upper bound on parallel ingest tasks. Must be greater than zero.
    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,

    /// How long a blocking read waits for the first table snapshot before
    /// failing, in milliseconds.
    #[serde(default = "default_tables_wait_timeout_ms")]
    pub tables_wait_timeout_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            table_poll_interval_ms: default_table_poll_interval_ms(),
            table_allowlist: Vec::new(),
            table_denylist: Vec::new(),
            query: String::new(),
            max_tasks: default_max_tasks(),
            tables_wait_timeout_ms: default_tables_wait_timeout_ms(),
        }
    }
}

impl MonitorConfig {
    /// Loads and validates the configuration from an optional file plus
    /// `TABLEWATCH_`-prefixed environment variables.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path));
        }
        let loaded = builder
            .add_source(Environment::with_prefix("TABLEWATCH").try_parsing(true))
            .build()?;
        let config: MonitorConfig = loaded.try_deserialize().map_err(Error::Config)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates field ranges and the mutual-exclusion rules between the
    /// table lists and free-form query mode. Runs before any monitor starts.
    pub fn validate(&self) -> Result<()> {
        if self.table_poll_interval_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "table_poll_interval_ms must be greater than 0".into(),
            )));
        }

        if self.max_tasks == 0 {
            return Err(Error::Config(ConfigError::Message(
                "max_tasks must be greater than 0".into(),
            )));
        }

        if self.tables_wait_timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "tables_wait_timeout_ms must be greater than 0".into(),
            )));
        }

        if !self.table_allowlist.is_empty() && !self.table_denylist.is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "table_allowlist and table_denylist are exclusive".into(),
            )));
        }

        if self.query_mode() && (!self.table_allowlist.is_empty() || !self.table_denylist.is_empty()) {
            return Err(Error::Config(ConfigError::Message(
                "query may not be combined with whole-table copying settings".into(),
            )));
        }

        Ok(())
    }

    /// True when a free-form query replaces whole-table copying.
    pub fn query_mode(&self) -> bool {
        !self.query.is_empty()
    }
}

fn default_table_poll_interval_ms() -> u64 {
    60_000
}

fn default_max_tasks() -> usize {
    1
}

// Matches the historical bound on the first blocking table read.
fn default_tables_wait_timeout_ms() -> u64 {
    10_000
}
