//! Helper functions for integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use probewatch::device::{
    CheckDefinition, Device, HttpProbe, MatcherRule, ProbeSpec, Schedule, TcpProbe, TimeUnit,
    UdpProbe,
};
use probewatch::probes::{ProbeExecutor, ProbeTimeouts};
use probewatch::storage::StorageBackend;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};

/// Executor with short timeouts so failure paths finish quickly
pub fn fast_executor() -> Arc<ProbeExecutor> {
    Arc::new(
        ProbeExecutor::new(ProbeTimeouts {
            http: Duration::from_secs(5),
            tcp: Duration::from_millis(500),
            udp: Duration::from_millis(300),
        })
        .unwrap(),
    )
}

pub fn http_device(id: &str, url: impl Into<String>, matchers: Vec<MatcherRule>) -> Device {
    Device::new(
        id,
        format!("HTTP {id}"),
        CheckDefinition::new(
            ProbeSpec::Http(HttpProbe::get(url)),
            Schedule::new(1, TimeUnit::Minutes),
        )
        .with_matchers(matchers),
    )
}

pub fn tcp_device(id: &str, host: &str, port: u16) -> Device {
    Device::new(
        id,
        format!("TCP {id}"),
        CheckDefinition::new(
            ProbeSpec::Tcp(TcpProbe {
                host: host.to_string(),
                port,
            }),
            Schedule::new(1, TimeUnit::Minutes),
        ),
    )
}

pub fn udp_probe(port: u16, payload: &str) -> UdpProbe {
    UdpProbe {
        host: "127.0.0.1".to_string(),
        port,
        payload: payload.to_string(),
    }
}

/// Port on loopback that nothing is listening on
pub async fn closed_tcp_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// UDP peer that echoes every datagram back to its sender
pub async fn spawn_udp_echo() -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = [0u8; 1024];
        while let Ok((len, from)) = socket.recv_from(&mut buf).await {
            let _ = socket.send_to(&buf[..len], from).await;
        }
    });

    addr
}

/// UDP socket that receives but never replies
pub async fn silent_udp_port() -> (UdpSocket, u16) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();
    (socket, port)
}

/// Poll the store until the device has been checked `count` times
pub async fn wait_for_logs(store: &dyn StorageBackend, device_id: &str, count: usize) {
    for _ in 0..200 {
        if store.query_logs(device_id, 100).await.unwrap().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("device {device_id} never reached {count} log entries");
}

/// Raw HTTP peer that promises a 1000-byte body but sends only a few bytes,
/// then either holds the connection open (`stall`) or closes it.
pub async fn spawn_truncated_http(stall: bool) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 1024];
        let _ = stream.read(&mut request).await;
        stream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\npartial")
            .await
            .unwrap();
        stream.flush().await.unwrap();
        if stall {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    });

    addr
}
