//! Test server harness shared by the integration tests.
//!
//! Spawns the real router on `127.0.0.1:0` over in-memory storage and a
//! seeded pairing generator.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::task::JoinHandle;

use donut_gateway::api::build_app;
use donut_gateway::app_state::AppState;
use donut_gateway::domain::NotificationBus;
use donut_gateway::service::DonutService;
use donut_gateway::storage::MemoryStorage;

/// A running server instance.
#[derive(Debug)]
pub struct TestServer {
    addr: SocketAddr,
    storage: MemoryStorage,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Binds a random port and serves the app in the background.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        let storage = MemoryStorage::new();
        let service = DonutService::with_rng(
            Arc::new(storage.clone()),
            NotificationBus::new(256),
            Box::new(StdRng::seed_from_u64(2024)),
        );
        let app = build_app(AppState::new(Arc::new(service)), Duration::from_secs(10));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("test server error: {e}");
            }
        });

        Ok(Self {
            addr,
            storage,
            _handle: handle,
        })
    }

    /// Base HTTP URL.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// WebSocket endpoint URL.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Backing store, for commit counting.
    pub fn storage(&self) -> &MemoryStorage {
        &self.storage
    }
}

/// Creates an event and registers `references` on it. Returns the serial.
pub async fn seeded_event(
    server: &TestServer,
    client: &reqwest::Client,
    references: &[&str],
) -> Result<String, anyhow::Error> {
    let created: serde_json::Value = client
        .post(format!("{}/api/v1/events", server.url()))
        .json(&serde_json::json!({ "name": "weekly donut" }))
        .send()
        .await?
        .json()
        .await?;
    let serial = created["serial"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("missing serial in {created}"))?
        .to_string();

    if !references.is_empty() {
        let response = client
            .post(format!("{}/api/v1/events/{serial}/participants", server.url()))
            .json(&serde_json::json!({ "references": references }))
            .send()
            .await?;
        anyhow::ensure!(response.status() == 201, "register failed: {}", response.status());
    }
    Ok(serial)
}
