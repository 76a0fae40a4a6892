//! Connector-level glue: wires configuration, the table monitor and the
//! task partitioner together the way a host orchestrator drives them.


use std::sync::Arc;

use tracing::info;
use tracing::trace;

use crate::catalog::TableId;
use crate::config::MonitorConfig;
use crate::errors::MonitorError;
use crate::monitor::MonitorHandle;
use crate::monitor::OrchestratorCallback;
use crate::monitor::TableMonitor;
use crate::partition::task_tables;
use crate::source::ConnectionProvider;
use crate::source::DialectLister;
use crate::Result;

/// Owns the monitor lifecycle on behalf of the host orchestrator: start it,
/// turn its snapshots into per-task table assignments on demand, and tear it
/// down cleanly.
pub struct SourceCoordinator<L, P, C> {
    config: MonitorConfig,
    lister: Arc<L>,
    provider: Arc<P>,
    callback: Arc<C>,
    handle: Option<MonitorHandle>,
}

impl<L, P, C> SourceCoordinator<L, P, C>
where
    L: DialectLister + 'static,
    P: ConnectionProvider + 'static,
    C: OrchestratorCallback + 'static,
{
    /// Validates the configuration up front; nothing runs yet.
    pub fn new(
        config: MonitorConfig,
        lister: Arc<L>,
        provider: Arc<P>,
        callback: Arc<C>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            lister,
            provider,
            callback,
            handle: None,
        })
    }

    /// Starts the table monitor. Idempotent while already running.
    pub fn start(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Ok(());
        }
        info!("Starting source coordinator");
        let monitor = TableMonitor::new(
            self.lister.clone(),
            self.provider.clone(),
            self.callback.clone(),
            &self.config,
        )?;
        self.handle = Some(monitor.start());
        Ok(())
    }

    /// Computes per-task table assignments from the current snapshot,
    /// capped at `max_tasks`. In free-form query mode a single assignment
    /// with the empty-table sentinel is returned without consulting the
    /// monitor.
    pub async fn task_assignments(&self, max_tasks: usize) -> Result<Vec<Vec<TableId>>> {
        if self.config.query_mode() {
            trace!("Task assignments for query mode");
            return Ok(task_tables(true, &[], max_tasks));
        }
        let handle = self.handle.as_ref().ok_or(MonitorError::Stopped)?;
        let snapshot = handle.tables().await?;
        let assignments = task_tables(false, snapshot.tables(), max_tasks);
        trace!("Task assignments over {} tables: {assignments:?}", snapshot.len());
        Ok(assignments)
    }

    /// Stops the monitor and invalidates the provider's cached connection.
    pub async fn stop(&mut self) -> Result<()> {
        info!("Stopping table monitoring task");
        let shutdown = match self.handle.take() {
            Some(handle) => handle.shutdown().await,
            None => Ok(()),
        };
        self.provider.close().await;
        shutdown
    }
}
