//! Table Monitoring Error Hierarchy
//!
//! Defines error types for the table-discovery core, categorized by where
//! they surface: collaborator (source) failures, monitor lifecycle failures,
//! and configuration validation failures.

use std::collections::BTreeMap;
use std::time::Duration;

use config::ConfigError;
use tokio::task::JoinError;

use crate::catalog::TableId;
use crate::filter::FilterSetting;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Table monitor lifecycle and discovery failures
    #[error(transparent)]
    Monitor(#[from] MonitorError),

    /// Unrecoverable failures requiring connector termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Failures raised by the table monitor or surfaced through its blocking
/// accessor.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// No snapshot was published within the bounded first-read wait
    #[error("Tables could not be updated quickly enough (no table snapshot after {0:?})")]
    SnapshotTimeout(Duration),

    /// Two or more qualified tables survived filtering with the same
    /// unqualified name
    #[error(
        "The connector uses the unqualified table name to route records downstream and has \
         detected duplicate unqualified table names. This could lead to mixed data types \
         downstream. Update the connector's {setting} config to include exactly one table in \
         each of the groups listed below.\n\t{groups}"
    )]
    DuplicateTableNames { setting: &'static str, groups: String },

    /// The monitor task exited before serving this request
    #[error("Table monitor is no longer running")]
    Stopped,

    /// Unrecoverable collaborator failure that ended the poll loop
    #[error("Unrecoverable source failure: {0}")]
    Source(#[from] SourceError),

    /// The background task panicked or was aborted
    #[error("Monitor task failed: {0}")]
    TaskFailed(#[from] JoinError),

    /// The background task did not observe the stop signal in time
    #[error("Monitor task did not stop within {0:?}")]
    ShutdownTimeout(Duration),
}

impl MonitorError {
    /// Builds the duplicate-name error from the snapshot's collision map,
    /// naming the filter setting the operator has to narrow.
    pub(crate) fn duplicate_names(
        setting: FilterSetting,
        duplicates: &BTreeMap<String, Vec<TableId>>,
    ) -> Self {
        let groups = duplicates
            .values()
            .map(|group| {
                let members = group.iter().map(TableId::fqn_unquoted).collect::<Vec<_>>();
                format!("[{}]", members.join(", "))
            })
            .collect::<Vec<_>>()
            .join(", ");
        MonitorError::DuplicateTableNames {
            setting: setting.config_text(),
            groups,
        }
    }
}

/// Failures reported by the external-store collaborators while acquiring a
/// connection or listing tables.
///
/// Everything except [`SourceError::Fatal`] is treated as transient by the
/// monitor: the cycle is skipped, the cached connection discarded, and the
/// listing retried on the next poll interval.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// External store unreachable or connection handshake failed
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The table-listing query itself failed
    #[error("table listing failed: {0}")]
    Listing(String),

    /// Collaborator-declared unrecoverable failure; ends the poll loop
    #[error("{0}")]
    Fatal(String),
}

impl SourceError {
    pub fn is_transient(&self) -> bool {
        !matches!(self, SourceError::Fatal(_))
    }
}
