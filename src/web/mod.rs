//! HTTP exposition of collected metrics.
//!
//! Each request to the metrics path triggers one collection pass; there is no
//! background polling.

pub mod config;
pub mod handlers;
pub mod router;

// Re-export commonly used items
pub use config::WebConfig;
pub use handlers::AppState;
pub use router::create_app;

use crate::error::{ExporterError, Result};
use crate::metrics::Orchestrator;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

/// Lets a request handler ask the server to stop.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: Arc<watch::Sender<Option<String>>>,
}

impl ShutdownTrigger {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown. Only the first reason is kept.
    pub fn trigger(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason);
                true
            } else {
                false
            }
        });
    }

    /// Why shutdown was requested, if it was.
    pub fn reason(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    /// Resolve once shutdown has been requested.
    pub async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        while rx.borrow_and_update().is_none() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for ShutdownTrigger {
    fn default() -> Self {
        Self::new()
    }
}

/// Start the web server and serve scrapes until Ctrl-C or a fatal collection failure.
pub async fn start_web_server(config: &WebConfig, orchestrator: Arc<Orchestrator>) -> Result<()> {
    config.validate()?;
    let addr = config.bind_address()?;

    let state = AppState::new(orchestrator, &config.metrics_path);
    let shutdown = state.shutdown.clone();
    let app = create_app(state);

    let listener = bind_listener(addr).await?;
    let addr = listener.local_addr().unwrap_or(addr);

    info!("Starting sensor exporter on http://{}", addr);
    info!("Metrics available at http://{}{}", addr, config.metrics_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .map_err(|e| ExporterError::web_server_error(format!("Server error: {}", e)))?;

    match shutdown.reason() {
        Some(reason) => Err(ExporterError::web_server_error(format!(
            "Stopped after fatal collection failure: {}",
            reason
        ))),
        None => Ok(()),
    }
}

/// Bind the listener, falling back to IPv4 when an all-interfaces IPv6 bind fails.
async fn bind_listener(addr: SocketAddr) -> Result<TcpListener> {
    match TcpListener::bind(addr).await {
        Ok(listener) => Ok(listener),
        Err(e) if addr.is_ipv6() && addr.ip().is_unspecified() => {
            let fallback = SocketAddr::from((Ipv4Addr::UNSPECIFIED, addr.port()));
            warn!("Failed to bind to {}: {}; using {}", addr, e, fallback);
            TcpListener::bind(fallback).await.map_err(|e| {
                ExporterError::web_server_error(format!("Failed to bind to {}: {}", fallback, e))
            })
        }
        Err(e) => Err(ExporterError::web_server_error(format!(
            "Failed to bind to {}: {}",
            addr, e
        ))),
    }
}

async fn shutdown_signal(trigger: ShutdownTrigger) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl-C: {}", e);
                // Keep serving until a fatal failure instead.
                trigger.triggered().await;
            } else {
                info!("Received Ctrl-C, shutting down");
            }
        }
        _ = trigger.triggered() => {
            warn!("Fatal collection failure, shutting down");
        }
    }
}
