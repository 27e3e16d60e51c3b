//! Integration tests for the scheduler
//!
//! These tests verify that:
//! - A device with a probe still running is not dispatched again
//! - A slow or failing device does not hold up the others
//! - Outcomes land in the store with matching status and log entry
//! - The timer drives probes without manual ticks

use std::sync::Arc;
use std::time::Duration;

use probewatch::actors::{SchedulerHandle, SchedulerSettings};
use probewatch::device::{COLOR_FAIL, COLOR_OK, Schedule, TimeUnit};
use probewatch::storage::{MemoryBackend, StorageBackend};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{closed_tcp_port, fast_executor, http_device, tcp_device, wait_for_logs};

fn manual_settings() -> SchedulerSettings {
    SchedulerSettings {
        tick: Duration::from_secs(3600),
    }
}

#[tokio::test]
async fn test_in_flight_device_is_not_dispatched_twice() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("eventually")
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&mock_server)
        .await;

    // Due on every tick so only the in-flight guard can prevent overlap
    let mut device = http_device("slow", format!("{}/slow", mock_server.uri()), vec![]);
    device.check.schedule = Schedule::new(1, TimeUnit::Seconds);

    let store = Arc::new(MemoryBackend::new());
    store.upsert_device(device).await.unwrap();

    let (handle, task) = SchedulerHandle::spawn(store.clone(), fast_executor(), manual_settings());

    let first = handle.tick_now().await.unwrap();
    assert_eq!(first.dispatched, 1);

    let second = handle.tick_now().await.unwrap();
    assert_eq!(second.due, 1);
    assert_eq!(second.dispatched, 0);
    assert_eq!(second.skipped_in_flight, 1);
    assert_eq!(handle.in_flight(), 1);

    wait_for_logs(store.as_ref(), "slow", 1).await;
    handle.shutdown().await;
    task.await.unwrap();

    assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);
    assert_eq!(store.query_logs("slow", 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_slow_device_does_not_block_others() {
    let mock_server = MockServer::start().await;
    Mock::given(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let store = Arc::new(MemoryBackend::new());
    store
        .upsert_device(http_device("slow", format!("{}/slow", mock_server.uri()), vec![]))
        .await
        .unwrap();
    store
        .upsert_device(tcp_device("fast", "127.0.0.1", port))
        .await
        .unwrap();

    let (handle, task) = SchedulerHandle::spawn(store.clone(), fast_executor(), manual_settings());
    let report = handle.tick_now().await.unwrap();
    assert_eq!(report.dispatched, 2);

    // The TCP device commits well before the slow HTTP response arrives
    wait_for_logs(store.as_ref(), "fast", 1).await;
    assert!(store.query_logs("slow", 10).await.unwrap().is_empty());

    handle.shutdown().await;
    task.await.unwrap();
    assert_eq!(store.query_logs("slow", 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_failing_device_commits_failure_and_others_succeed() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let open_port = listener.local_addr().unwrap().port();
    let closed_port = closed_tcp_port().await;

    let store = Arc::new(MemoryBackend::new());
    store
        .upsert_device(tcp_device("up", "127.0.0.1", open_port))
        .await
        .unwrap();
    store
        .upsert_device(tcp_device("down", "127.0.0.1", closed_port))
        .await
        .unwrap();

    let (handle, task) = SchedulerHandle::spawn(store.clone(), fast_executor(), manual_settings());
    handle.tick_now().await.unwrap();
    handle.shutdown().await;
    task.await.unwrap();

    let up = store.get_device("up").await.unwrap().unwrap();
    assert_eq!(up.last_color.as_deref(), Some(COLOR_OK));

    let down = store.get_device("down").await.unwrap().unwrap();
    assert_eq!(down.last_color.as_deref(), Some(COLOR_FAIL));
    assert!(down.enabled);

    let logs = store.query_logs("down", 10).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert!(!logs[0].ok);
    assert_eq!(Some(logs[0].timestamp), down.last_checked_at);
    assert_eq!(Some(&logs[0].message), down.last_message.as_ref());
}

#[tokio::test]
async fn test_deleted_device_commit_is_dropped() {
    let mock_server = MockServer::start().await;
    Mock::given(path("/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryBackend::new());
    store
        .upsert_device(http_device("gone", mock_server.uri(), vec![]))
        .await
        .unwrap();

    let (handle, task) = SchedulerHandle::spawn(store.clone(), fast_executor(), manual_settings());
    handle.tick_now().await.unwrap();
    assert!(store.delete_device("gone").await.unwrap());

    handle.shutdown().await;
    task.await.unwrap();

    assert!(store.get_device("gone").await.unwrap().is_none());
    assert!(store.query_logs("gone", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_timer_drives_probes() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut device = tcp_device("ticked", "127.0.0.1", port);
    device.check.schedule = Schedule::new(1, TimeUnit::Seconds);

    let store = Arc::new(MemoryBackend::new());
    store.upsert_device(device).await.unwrap();

    let settings = SchedulerSettings {
        tick: Duration::from_millis(100),
    };
    let (handle, task) = SchedulerHandle::spawn(store.clone(), fast_executor(), settings);

    wait_for_logs(store.as_ref(), "ticked", 2).await;
    handle.shutdown().await;
    task.await.unwrap();

    let logs = store.query_logs("ticked", 10).await.unwrap();
    assert!(logs.windows(2).all(|pair| pair[0].timestamp <= pair[1].timestamp));
    // 1s interval: consecutive probes are at least a second apart
    let gap = logs[1].timestamp - logs[0].timestamp;
    assert!(gap >= chrono::Duration::milliseconds(900));
}
