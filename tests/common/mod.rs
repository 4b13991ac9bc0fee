//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use api_router::config::AppConfig;
use api_router::lifecycle::Shutdown;
use api_router::{api, ApiServer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

pub const SECRET: &str = "integration-secret";

/// Start a mock legacy backend on an ephemeral port.
///
/// Every request is answered with `legacy <METHOD> <PATH?QUERY>` so tests can
/// see exactly what was forwarded.
pub async fn start_legacy_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&buf);
                let request_line = head.lines().next().unwrap_or_default();
                let mut parts = request_line.split_whitespace();
                let body = format!(
                    "legacy {} {}",
                    parts.next().unwrap_or("-"),
                    parts.next().unwrap_or("-")
                );
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// A valid config for tests, listening on an ephemeral port.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig {
        secrets: vec![SECRET.to_string()],
        request_timeout_secs: 5,
        ..AppConfig::default()
    };
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config
}

/// A running server with the built-in API.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub updates: mpsc::UnboundedSender<AppConfig>,
    pub handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn start(config: AppConfig) -> Self {
        let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = ApiServer::new(config, api::declarations()).unwrap();

        let shutdown = Shutdown::new();
        let server_shutdown = shutdown.subscribe();
        let (updates, config_updates) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            server.run(listener, config_updates, server_shutdown).await.unwrap();
        });

        Self {
            addr,
            shutdown,
            updates,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// A client that never pools or proxies, so each test sees fresh connections.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
