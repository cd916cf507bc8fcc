//! Web application router and middleware setup.

use crate::web::handlers::{self, AppState};
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

/// Create the axum application with the index and metrics routes.
pub fn create_app(state: AppState) -> Router {
    let metrics_path = state.metrics_path.to_string();

    Router::new()
        .route("/", get(handlers::index))
        .route(&metrics_path, get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Orchestrator;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(path: &str) -> Router {
        let orchestrator = Arc::new(Orchestrator::new());
        create_app(AppState::new(orchestrator, path))
    }

    #[tokio::test]
    async fn test_index_links_metrics_path() {
        let response = app("/custom")
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains(r#"<a href="/custom">Metrics</a>"#));
    }

    #[tokio::test]
    async fn test_metrics_route_uses_configured_path() {
        let response = app("/custom")
            .oneshot(Request::builder().uri("/custom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app("/custom")
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
