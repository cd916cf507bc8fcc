//! HTTP handlers for the metrics and index endpoints.

use crate::metrics::{exposition, Orchestrator};
use crate::web::ShutdownTrigger;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use tracing::error;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub metrics_path: Arc<str>,
    pub shutdown: ShutdownTrigger,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, metrics_path: &str) -> Self {
        Self {
            orchestrator,
            metrics_path: Arc::from(metrics_path),
            shutdown: ShutdownTrigger::new(),
        }
    }
}

/// Run one collection pass and return it in the Prometheus text format.
///
/// Degraded collectors only shrink the response; error details stay in the logs.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.orchestrator.scrape().await {
        Ok(body) => ([(header::CONTENT_TYPE, exposition::CONTENT_TYPE)], body).into_response(),
        Err(e) if e.is_fatal() => {
            error!("Shutting down: {}", e);
            state.shutdown.trigger(e.to_string());
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Minimal landing page linking to the metrics path.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        r#"<html>
<head><title>Sensor Exporter</title></head>
<body>
<h1>Sensor Exporter</h1>
<p><a href="{path}">Metrics</a></p>
</body>
</html>
"#,
        path = state.metrics_path
    ))
}
