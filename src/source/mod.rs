//! Contracts toward the external relational store.
//!
//! The monitor never talks to a database directly. A dialect-like lister
//! enumerates qualified tables over a connection handed out by a provider;
//! both are implemented by the surrounding connector and mocked in tests.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::catalog::TableId;
use crate::errors::SourceError;

/// Opaque handle to a live connection to the external store.
///
/// Acquisition, caching, retry and backoff all belong to the
/// [`ConnectionProvider`]; the monitor only threads the handle through to
/// the lister.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Connection {
    token: u64,
}

impl Connection {
    pub fn new(token: u64) -> Self {
        Self { token }
    }

    pub fn token(&self) -> u64 {
        self.token
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait DialectLister: Send + Sync {
    /// Lists every qualified table currently visible through `conn`, in the
    /// store's enumeration order. Errors are treated as transient by the
    /// monitor unless marked [`SourceError::Fatal`].
    async fn list_tables(&self, conn: &Connection) -> Result<Vec<TableId>, SourceError>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Hands back a usable connection, dialing or reusing a cached one per
    /// the provider's own policy.
    async fn connection(&self) -> Result<Connection, SourceError>;

    /// Discards any cached handle so the next [`Self::connection`] call
    /// dials fresh. Called by the monitor after a listing failure.
    async fn close(&self);
}
