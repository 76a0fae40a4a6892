//! Background monitoring of the external store's table set.
//!
//! One dedicated task polls the store on a fixed interval, filters the raw
//! listing, and publishes immutable [`TableSet`] snapshots over a watch
//! channel: a single writer, any number of readers, and built-in
//! wait-for-first-value semantics. Shutdown is a second watch channel raced
//! against the interval sleep, so the stop signal and the timer resolve in
//! one `select!` with shutdown given priority.

#[cfg(test)]
mod monitor_test;

use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio::time::timeout;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::catalog::TableId;
use crate::catalog::TableSet;
use crate::config::MonitorConfig;
use crate::errors::MonitorError;
use crate::errors::SourceError;
use crate::filter::FilterSetting;
use crate::filter::FilterSpec;
use crate::source::ConnectionProvider;
use crate::source::DialectLister;
use crate::Result;

/// Bound on waiting for the monitor task to observe the stop signal.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Signals the monitor raises toward the host orchestrator. Both methods are
/// invoked from the monitor's background task and must not block.
#[cfg_attr(test, automock)]
pub trait OrchestratorCallback: Send + Sync {
    /// The filtered table set changed after the first publish; task
    /// assignments should be recomputed.
    fn request_reconfiguration(&self);

    /// An unrecoverable error ended the poll loop.
    fn raise_error(&self, err: MonitorError);
}

/// Monitors the external store for changes to the set of tables the
/// connector should copy. Construction validates the configuration;
/// [`TableMonitor::start`] spawns the poll loop and hands back the
/// read/stop surface.
pub struct TableMonitor<L, P, C> {
    lister: Arc<L>,
    provider: Arc<P>,
    callback: Arc<C>,
    poll_interval: Duration,
    tables_timeout: Duration,
    filter: FilterSpec,
}

impl<L, P, C> TableMonitor<L, P, C>
where
    L: DialectLister + 'static,
    P: ConnectionProvider + 'static,
    C: OrchestratorCallback + 'static,
{
    /// Fails on any configuration conflict (both table lists set, query mode
    /// combined with a list, zero intervals) before any polling occurs.
    pub fn new(
        lister: Arc<L>,
        provider: Arc<P>,
        callback: Arc<C>,
        config: &MonitorConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            lister,
            provider,
            callback,
            poll_interval: Duration::from_millis(config.table_poll_interval_ms),
            tables_timeout: Duration::from_millis(config.tables_wait_timeout_ms),
            filter: FilterSpec::from_config(config),
        })
    }

    /// Spawns the poll loop on a dedicated task.
    pub fn start(self) -> MonitorHandle {
        info!("Starting task to monitor tables.");
        let (tables_tx, tables_rx) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let setting = self.filter.setting();
        let tables_timeout = self.tables_timeout;
        let join = tokio::spawn(self.run(tables_tx, shutdown_rx));
        MonitorHandle {
            tables_rx,
            shutdown_tx,
            join,
            setting,
            tables_timeout,
        }
    }

    async fn run(
        self,
        tables_tx: watch::Sender<Option<Arc<TableSet>>>,
        mut shutdown_rx: watch::Receiver<()>,
    ) {
        loop {
            match self.poll_once(&tables_tx).await {
                Ok(true) => self.callback.request_reconfiguration(),
                Ok(false) => {}
                Err(err) => {
                    error!("Table monitoring failed with an unrecoverable error: {err}");
                    self.callback.raise_error(err);
                    return;
                }
            }

            debug!("Waiting {:?} to check for changed tables.", self.poll_interval);
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("Stop signal received; table monitor exiting.");
                    return;
                }
                _ = sleep(self.poll_interval) => {}
            }
        }
    }

    /// One poll cycle. Returns `Ok(true)` when a change was published that
    /// should trigger task reconfiguration, which is any publish except the
    /// first. Transient source failures are swallowed here; only errors the
    /// collaborators declare unrecoverable propagate.
    async fn poll_once(
        &self,
        tables_tx: &watch::Sender<Option<Arc<TableSet>>>,
    ) -> std::result::Result<bool, MonitorError> {
        let raw = match self.list_tables().await {
            Ok(tables) => tables,
            Err(err) if err.is_transient() => {
                error!(
                    "Error while trying to get updated table list, ignoring and waiting \
                     for next poll interval: {err}"
                );
                self.provider.close().await;
                return Ok(false);
            }
            Err(err) => return Err(MonitorError::Source(err)),
        };
        debug!("Got the following tables: {raw:?}");

        let filtered = self.filter.apply(raw);
        let unchanged = tables_tx
            .borrow()
            .as_ref()
            .is_some_and(|current| current.tables() == filtered.as_slice());
        if unchanged {
            return Ok(false);
        }

        info!("After filtering the tables are: {}", render_table_list(&filtered));
        let first_publish = tables_tx.borrow().is_none();
        tables_tx.send_replace(Some(Arc::new(TableSet::new(filtered))));
        Ok(!first_publish)
    }

    async fn list_tables(&self) -> std::result::Result<Vec<TableId>, SourceError> {
        let conn = self.provider.connection().await?;
        self.lister.list_tables(&conn).await
    }
}

/// Read/stop surface of a running monitor. Cheap to share across whichever
/// threads the host orchestrator uses to request task configurations.
pub struct MonitorHandle {
    tables_rx: watch::Receiver<Option<Arc<TableSet>>>,
    shutdown_tx: watch::Sender<()>,
    join: JoinHandle<()>,
    setting: FilterSetting,
    tables_timeout: Duration,
}

impl MonitorHandle {
    /// Returns the current table snapshot, waiting up to the configured
    /// bound for the first publish.
    ///
    /// Fails with [`MonitorError::SnapshotTimeout`] when no snapshot arrives
    /// in time and with [`MonitorError::DuplicateTableNames`] whenever the
    /// current snapshot carries duplicate unqualified names. The duplicate
    /// check runs on every call: collisions discovered by a later poll must
    /// block callers just the same.
    pub async fn tables(&self) -> Result<Arc<TableSet>> {
        let mut rx = self.tables_rx.clone();
        let snapshot = match timeout(self.tables_timeout, rx.wait_for(|v| v.is_some())).await {
            Err(_) => return Err(MonitorError::SnapshotTimeout(self.tables_timeout).into()),
            Ok(Err(_)) => return Err(MonitorError::Stopped.into()),
            Ok(Ok(current)) => current.as_ref().cloned(),
        };
        let snapshot = snapshot.ok_or(MonitorError::Stopped)?;

        if snapshot.has_duplicates() {
            return Err(MonitorError::duplicate_names(self.setting, snapshot.duplicates()).into());
        }
        Ok(snapshot)
    }

    /// Signals the poll loop to exit at its next wait point. Idempotent; a
    /// poll cycle already in flight completes normally.
    pub fn stop(&self) {
        info!("Shutting down task monitoring tables.");
        let _ = self.shutdown_tx.send(());
    }

    /// Stops the loop and waits for the task to finish. Once this returns,
    /// no further reconfiguration callback will be invoked.
    pub async fn shutdown(self) -> Result<()> {
        self.stop();
        match timeout(SHUTDOWN_TIMEOUT, self.join).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(MonitorError::TaskFailed(err).into()),
            Err(_) => Err(MonitorError::ShutdownTimeout(SHUTDOWN_TIMEOUT).into()),
        }
    }
}

fn render_table_list(tables: &[TableId]) -> String {
    tables.iter().map(TableId::fqn_unquoted).collect::<Vec<_>>().join(",")
}
