use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::advance;
use tokio::time::sleep;

use crate::catalog::TableId;
use crate::config::MonitorConfig;
use crate::errors::SourceError;
use crate::monitor::MockOrchestratorCallback;
use crate::monitor::TableMonitor;
use crate::source::Connection;
use crate::source::MockConnectionProvider;
use crate::source::MockDialectLister;
use crate::Error;
use crate::MonitorError;

fn test_config() -> MonitorConfig {
    MonitorConfig {
        table_poll_interval_ms: 100,
        tables_wait_timeout_ms: 500,
        ..MonitorConfig::default()
    }
}

fn provider_ok() -> MockConnectionProvider {
    let mut provider = MockConnectionProvider::new();
    provider.expect_connection().returning(|| Ok(Connection::default()));
    provider.expect_close().returning(|| ());
    provider
}

fn quiet_callback() -> MockOrchestratorCallback {
    let mut callback = MockOrchestratorCallback::new();
    callback.expect_request_reconfiguration().never();
    callback.expect_raise_error().never();
    callback
}

/// Waits until the lister has been polled at least `count` times.
async fn wait_for_polls(polls: &AtomicUsize, count: usize) {
    while polls.load(Ordering::SeqCst) < count {
        sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_first_publish_does_not_reconfigure_but_a_change_does_once() {
    let polls = Arc::new(AtomicUsize::new(0));
    let mut lister = MockDialectLister::new();
    let counter = polls.clone();
    lister.expect_list_tables().returning(move |_| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        let mut tables = vec![TableId::qualified("public", "users")];
        // The table set changes from the third poll onward and then stays put
        if n >= 2 {
            tables.push(TableId::qualified("public", "orders"));
        }
        Ok(tables)
    });

    let reconfigs = Arc::new(AtomicUsize::new(0));
    let mut callback = MockOrchestratorCallback::new();
    let counter = reconfigs.clone();
    callback.expect_request_reconfiguration().returning(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    callback.expect_raise_error().never();

    let monitor = TableMonitor::new(
        Arc::new(lister),
        Arc::new(provider_ok()),
        Arc::new(callback),
        &test_config(),
    )
    .expect("valid config");
    let handle = monitor.start();

    let snapshot = handle.tables().await.expect("first snapshot");
    assert_eq!(snapshot.len(), 1);
    assert_eq!(reconfigs.load(Ordering::SeqCst), 0);

    // Let the change land and several identical polls follow it
    wait_for_polls(&polls, 6).await;
    assert_eq!(reconfigs.load(Ordering::SeqCst), 1);

    let snapshot = handle.tables().await.expect("updated snapshot");
    assert_eq!(snapshot.len(), 2);

    handle.shutdown().await.expect("clean shutdown");
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_names_fail_every_read_until_resolved() {
    let polls = Arc::new(AtomicUsize::new(0));
    let mut lister = MockDialectLister::new();
    let counter = polls.clone();
    lister.expect_list_tables().returning(move |_| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        if n < 3 {
            Ok(vec![
                TableId::qualified("sales", "orders"),
                TableId::qualified("archive", "orders"),
            ])
        } else {
            Ok(vec![TableId::qualified("sales", "orders")])
        }
    });

    let mut callback = MockOrchestratorCallback::new();
    // The shrink from two tables to one is a real change
    callback.expect_request_reconfiguration().returning(|| ());
    callback.expect_raise_error().never();

    let monitor = TableMonitor::new(
        Arc::new(lister),
        Arc::new(provider_ok()),
        Arc::new(callback),
        &test_config(),
    )
    .expect("valid config");
    let handle = monitor.start();

    let err = handle.tables().await.expect_err("duplicates must fail");
    assert!(matches!(
        err,
        Error::Monitor(MonitorError::DuplicateTableNames { .. })
    ));
    let message = err.to_string();
    assert!(message.contains("'table_allowlist' or 'table_denylist'"));
    assert!(message.contains("sales.orders"));
    assert!(message.contains("archive.orders"));

    // Idempotent: a second read while the collision persists fails the same way
    let err = handle.tables().await.expect_err("still failing");
    assert!(matches!(
        err,
        Error::Monitor(MonitorError::DuplicateTableNames { .. })
    ));

    // Once a later poll removes the collision, reads succeed again
    wait_for_polls(&polls, 5).await;
    let snapshot = handle.tables().await.expect("collision resolved");
    assert_eq!(snapshot.tables(), &[TableId::qualified("sales", "orders")]);

    handle.shutdown().await.expect("clean shutdown");
}

#[tokio::test(start_paused = true)]
async fn test_transient_listing_failure_discards_connection_and_retries() {
    let polls = Arc::new(AtomicUsize::new(0));
    let mut lister = MockDialectLister::new();
    let counter = polls.clone();
    lister.expect_list_tables().returning(move |_| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            Err(SourceError::Listing("connection reset".into()))
        } else {
            Ok(vec![TableId::qualified("public", "users")])
        }
    });

    let closes = Arc::new(AtomicUsize::new(0));
    let mut provider = MockConnectionProvider::new();
    provider.expect_connection().returning(|| Ok(Connection::default()));
    let counter = closes.clone();
    provider.expect_close().returning(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    // The successful retry is the first-ever publish, so no reconfiguration
    let callback = quiet_callback();

    let monitor = TableMonitor::new(
        Arc::new(lister),
        Arc::new(provider),
        Arc::new(callback),
        &test_config(),
    )
    .expect("valid config");
    let handle = monitor.start();

    let snapshot = handle.tables().await.expect("snapshot after retry");
    assert_eq!(snapshot.len(), 1);
    assert_eq!(closes.load(Ordering::SeqCst), 1);

    handle.shutdown().await.expect("clean shutdown");
}

#[tokio::test(start_paused = true)]
async fn test_tables_times_out_without_a_snapshot() {
    let mut lister = MockDialectLister::new();
    lister
        .expect_list_tables()
        .returning(|_| Err(SourceError::Unavailable("store down".into())));

    let monitor = TableMonitor::new(
        Arc::new(lister),
        Arc::new(provider_ok()),
        Arc::new(quiet_callback()),
        &test_config(),
    )
    .expect("valid config");
    let handle = monitor.start();

    let err = handle.tables().await.expect_err("no snapshot to serve");
    assert!(matches!(err, Error::Monitor(MonitorError::SnapshotTimeout(_))));

    handle.shutdown().await.expect("clean shutdown");
}

#[tokio::test(start_paused = true)]
async fn test_stop_exits_without_starting_another_cycle() {
    let polls = Arc::new(AtomicUsize::new(0));
    let mut lister = MockDialectLister::new();
    let counter = polls.clone();
    lister.expect_list_tables().returning(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(vec![TableId::qualified("public", "users")])
    });

    let monitor = TableMonitor::new(
        Arc::new(lister),
        Arc::new(provider_ok()),
        Arc::new(quiet_callback()),
        &test_config(),
    )
    .expect("valid config");
    let handle = monitor.start();

    handle.tables().await.expect("first snapshot");
    handle.shutdown().await.expect("clean shutdown");

    let after_shutdown = polls.load(Ordering::SeqCst);
    // Several intervals later, no further cycle has started
    advance(Duration::from_millis(1_000)).await;
    assert_eq!(polls.load(Ordering::SeqCst), after_shutdown);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_source_error_is_raised_and_ends_the_loop() {
    let mut lister = MockDialectLister::new();
    lister
        .expect_list_tables()
        .returning(|_| Err(SourceError::Fatal("dialect state corrupt".into())));

    let mut provider = MockConnectionProvider::new();
    provider.expect_connection().returning(|| Ok(Connection::default()));
    // Fatal errors do not go through the discard-and-retry path
    provider.expect_close().never();

    let raised = Arc::new(AtomicUsize::new(0));
    let mut callback = MockOrchestratorCallback::new();
    callback.expect_request_reconfiguration().never();
    let counter = raised.clone();
    callback.expect_raise_error().returning(move |err| {
        assert!(matches!(err, MonitorError::Source(SourceError::Fatal(_))));
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let monitor = TableMonitor::new(
        Arc::new(lister),
        Arc::new(provider),
        Arc::new(callback),
        &test_config(),
    )
    .expect("valid config");
    let handle = monitor.start();

    // The loop ends before publishing anything, dropping the snapshot channel
    let err = handle.tables().await.expect_err("monitor stopped");
    assert!(matches!(err, Error::Monitor(MonitorError::Stopped)));
    assert_eq!(raised.load(Ordering::SeqCst), 1);

    // The task has already exited; shutdown just joins it
    handle.shutdown().await.expect("join finished task");
}

#[tokio::test]
async fn test_construction_rejects_conflicting_filters_before_any_poll() {
    let config = MonitorConfig {
        table_allowlist: vec!["users".into()],
        table_denylist: vec!["orders".into()],
        ..test_config()
    };

    // None of the collaborators may be touched
    let lister = MockDialectLister::new();
    let provider = MockConnectionProvider::new();
    let callback = MockOrchestratorCallback::new();

    let result = TableMonitor::new(Arc::new(lister), Arc::new(provider), Arc::new(callback), &config);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[tokio::test]
async fn test_construction_rejects_zero_poll_interval() {
    let config = MonitorConfig {
        table_poll_interval_ms: 0,
        ..MonitorConfig::default()
    };
    let result = TableMonitor::new(
        Arc::new(MockDialectLister::new()),
        Arc::new(MockConnectionProvider::new()),
        Arc::new(MockOrchestratorCallback::new()),
        &config,
    );
    assert!(matches!(result, Err(Error::Config(_))));
}
