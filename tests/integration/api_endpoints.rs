//! Integration tests for API endpoints
//!
//! These tests verify that:
//! - Device CRUD and log endpoints return the dashboard's shapes
//! - Template endpoints store and list templates
//! - run-now probes real targets without persisting anything
//! - Error bodies are `{ok: false, message}`

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use probewatch::api::{ApiConfig, ApiState, spawn_api_server};
use probewatch::device::LogEntry;
use probewatch::storage::{MemoryBackend, StorageBackend};
use serde_json::{Value, json};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{fast_executor, tcp_device};

// Helper to create test API server
async fn spawn_test_api(store: Arc<MemoryBackend>) -> SocketAddr {
    let state = ApiState::new(store, fast_executor());

    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(), // Random port
        enable_cors: true,
    };

    spawn_api_server(config, state).await.unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let addr = spawn_test_api(Arc::new(MemoryBackend::new())).await;

    let response = reqwest::get(format!("http://{addr}/api/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_device_lifecycle() {
    let store = Arc::new(MemoryBackend::new());
    let addr = spawn_test_api(store.clone()).await;
    let client = reqwest::Client::new();

    let created: Value = client
        .post(format!("http://{addr}/api/devices"))
        .json(&json!({
            "name": "Web",
            "description": "public site",
            "enabled": true,
            "template": {
                "requestType": "HTTP",
                "method": "get",
                "urlOrHost": "https://example.com",
                "headers": {"Accept": "text/html"},
                "every": 5,
                "unit": "minutes",
                "matchers": [{"id": "m1", "pattern": "maintenance", "color": "#facc15"}]
            }
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created["ok"], true);
    let id = created["id"].as_str().unwrap().to_string();

    let devices: Value = client
        .get(format!("http://{addr}/api/devices"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let device = &devices[0];
    assert_eq!(device["id"], id.as_str());
    assert_eq!(device["template"]["method"], "GET");
    assert_eq!(device["template"]["every"], 5);
    assert_eq!(device["template"]["matchers"][0]["pattern"], "maintenance");
    assert!(device.get("lastCheckedAt").is_none());

    // Update in place keeps the id
    let updated: Value = client
        .post(format!("http://{addr}/api/devices"))
        .json(&json!({
            "id": id,
            "name": "Web (renamed)",
            "enabled": false,
            "template": {"requestType": "HTTP", "urlOrHost": "https://example.com"}
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["id"], id.as_str());
    assert!(store.list_enabled().await.unwrap().is_empty());

    let response = client
        .delete(format!("http://{addr}/api/devices/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(store.list_devices().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_device_logs_oldest_first_with_limit() {
    let store = Arc::new(MemoryBackend::new());
    store
        .upsert_device(tcp_device("db", "10.0.0.5", 5432))
        .await
        .unwrap();

    let base = Utc::now() - Duration::minutes(10);
    for i in 0..5 {
        store
            .commit_outcome(&LogEntry {
                id: None,
                device_id: "db".to_string(),
                timestamp: base + Duration::minutes(i),
                ok: i % 2 == 0,
                message: format!("probe {i}"),
                color: "#22c55e".to_string(),
            })
            .await
            .unwrap();
    }

    let addr = spawn_test_api(store).await;
    let logs: Value = reqwest::get(format!("http://{addr}/api/devices/db/logs?limit=3"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let messages: Vec<_> = logs
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["message"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(messages, vec!["probe 2", "probe 3", "probe 4"]);
    assert_eq!(logs[0]["deviceId"], "db");
}

#[tokio::test]
async fn test_delete_unknown_device() {
    let addr = spawn_test_api(Arc::new(MemoryBackend::new())).await;

    let response = reqwest::Client::new()
        .delete(format!("http://{addr}/api/devices/missing"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], false);
    assert!(body["message"].as_str().unwrap().contains("missing"));
}

#[tokio::test]
async fn test_templates() {
    let addr = spawn_test_api(Arc::new(MemoryBackend::new())).await;
    let client = reqwest::Client::new();

    let created: Value = client
        .post(format!("http://{addr}/api/templates"))
        .json(&json!({
            "name": "DNS",
            "requestType": "UDP",
            "urlOrHost": "1.1.1.1",
            "payload": "ping",
            "every": 30,
            "unit": "seconds"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created["ok"], true);

    let templates: Value = client
        .get(format!("http://{addr}/api/templates"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(templates[0]["name"], "DNS");
    assert_eq!(templates[0]["port"], 53);
    assert_eq!(templates[0]["unit"], "seconds");
}

#[tokio::test]
async fn test_run_now_does_not_persist() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("degraded"))
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryBackend::new());
    let addr = spawn_test_api(store.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/run-now"))
        .json(&json!({
            "requestType": "HTTP",
            "urlOrHost": mock_server.uri(),
            "matchers": [{"id": "d", "pattern": "DEGRADED", "color": "#facc15"}]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let outcome: Value = response.json().await.unwrap();
    assert_eq!(outcome["ok"], true);
    assert_eq!(outcome["color"], "#facc15");
    assert!(outcome["message"].as_str().unwrap().starts_with("503 Service Unavailable"));

    assert!(store.list_devices().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_run_now_rejects_missing_fields() {
    let addr = spawn_test_api(Arc::new(MemoryBackend::new())).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/run-now"))
        .json(&json!({"urlOrHost": "10.0.0.1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"ok": false, "message": "requestType/urlOrHost required"}));
}
