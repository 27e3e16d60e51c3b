//! Integration tests for SQLite persistence
//!
//! These tests verify that:
//! - Devices, logs and templates survive a backend restart
//! - Scheduler commits are visible through a reopened database
//! - Rows with an unknown request type do not poison listing

use std::sync::Arc;

use chrono::Utc;
use probewatch::actors::{SchedulerHandle, SchedulerSettings};
use probewatch::device::{CheckDefinition, LogEntry, ProbeSpec, Schedule, Template};
use probewatch::storage::{StorageBackend, sqlite::SqliteBackend};
use tempfile::tempdir;

use crate::helpers::{fast_executor, tcp_device};

#[tokio::test]
async fn test_data_survives_restart() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("persist.db");

    {
        let backend = SqliteBackend::new(&db_path).await.unwrap();
        backend
            .upsert_device(tcp_device("db", "10.0.0.5", 5432))
            .await
            .unwrap();
        backend
            .commit_outcome(&LogEntry {
                id: None,
                device_id: "db".to_string(),
                timestamp: Utc::now(),
                ok: false,
                message: "10.0.0.5:5432: timeout after 4000ms".to_string(),
                color: "#ef4444".to_string(),
            })
            .await
            .unwrap();
        backend
            .create_template(Template {
                id: "pg".to_string(),
                name: "Postgres".to_string(),
                description: None,
                check: tcp_device("x", "0.0.0.0", 5432).check,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        backend.close().await.unwrap();
    }

    let backend = SqliteBackend::new(&db_path).await.unwrap();

    let device = backend.get_device("db").await.unwrap().unwrap();
    assert_eq!(
        device.last_message.as_deref(),
        Some("10.0.0.5:5432: timeout after 4000ms")
    );
    assert_eq!(backend.query_logs("db", 10).await.unwrap().len(), 1);
    assert_eq!(backend.list_templates().await.unwrap()[0].id, "pg");
}

#[tokio::test]
async fn test_scheduler_commits_to_sqlite() {
    let temp_dir = tempdir().unwrap();
    let backend = Arc::new(SqliteBackend::new(temp_dir.path().join("sched.db")).await.unwrap());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    backend
        .upsert_device(tcp_device("local", "127.0.0.1", port))
        .await
        .unwrap();

    let settings = SchedulerSettings {
        tick: std::time::Duration::from_secs(3600),
    };
    let (handle, task) = SchedulerHandle::spawn(backend.clone(), fast_executor(), settings);
    handle.tick_now().await.unwrap();
    handle.shutdown().await;
    task.await.unwrap();

    let device = backend.get_device("local").await.unwrap().unwrap();
    let logs = backend.query_logs("local", 10).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].ok);
    assert_eq!(device.last_checked_at, Some(logs[0].timestamp));
    assert_eq!(device.last_color, Some(logs[0].color.clone()));
}

#[tokio::test]
async fn test_unknown_request_type_row_is_listed() {
    let temp_dir = tempdir().unwrap();
    let backend = SqliteBackend::new(temp_dir.path().join("odd.db")).await.unwrap();

    let mut device = tcp_device("odd", "10.0.0.1", 0);
    device.check = CheckDefinition::new(
        ProbeSpec::Unsupported {
            request_type: "ICMP".to_string(),
            target: "10.0.0.1".to_string(),
        },
        Schedule::default(),
    );
    backend.upsert_device(device).await.unwrap();
    backend
        .upsert_device(tcp_device("normal", "10.0.0.2", 22))
        .await
        .unwrap();

    let enabled = backend.list_enabled().await.unwrap();
    assert_eq!(enabled.len(), 2);
    let odd = enabled.iter().find(|d| d.id == "odd").unwrap();
    assert_eq!(odd.check.probe.request_type(), "ICMP");
}
