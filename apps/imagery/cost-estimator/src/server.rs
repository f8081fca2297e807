//! HTTP API: routing, middleware and process signals

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use core_config::ServerConfig;
use domain_imagery_pricing::{EstimationService, handlers};
use observability::{metrics_handler, metrics_middleware};
use serde_json::json;
use std::io;
use std::path::PathBuf;
use tokio::signal;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};
use utoipa::OpenApi;

/// Combined OpenAPI documentation for the cost estimator
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Imagery Cost Estimator API",
        version = "0.1.0",
        description = "Credit cost estimation for aerial imagery requests"
    ),
    nest(
        (path = "/api", api = domain_imagery_pricing::ApiDoc)
    )
)]
pub struct ApiDoc;

/// Full application router
pub fn app(service: EstimationService) -> Router {
    Router::new()
        .route("/api-docs/openapi.json", get(openapi_json))
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .nest("/api", handlers::router(service))
        .fallback(not_found)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not found", "code": 404 })),
    )
}

/// Serve until SIGINT/SIGTERM. With a catalog file configured, SIGHUP
/// reloads it in place.
pub async fn serve(
    service: EstimationService,
    server_config: &ServerConfig,
    catalog_path: Option<PathBuf>,
) -> io::Result<()> {
    let reloader = catalog_path.map(|path| tokio::spawn(reload_on_hangup(service.clone(), path)));

    let listener = tokio::net::TcpListener::bind(server_config.address()).await?;
    info!("Server starting on {}", listener.local_addr()?);

    let result = axum::serve(listener, app(service).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .inspect_err(|e| tracing::error!("Server encountered an error: {:?}", e));

    if let Some(handle) = reloader {
        handle.abort();
    }
    info!("Server stopped");
    result
}

/// Completes on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal, shutting down gracefully"),
        _ = terminate => info!("Received SIGTERM signal, shutting down gracefully"),
    }
}

#[cfg(unix)]
async fn reload_on_hangup(service: EstimationService, path: PathBuf) {
    let mut hangup = match signal::unix::signal(signal::unix::SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            warn!(error = %e, "Failed to install SIGHUP handler, catalog reload disabled");
            return;
        }
    };

    while hangup.recv().await.is_some() {
        info!(path = %path.display(), "SIGHUP received, reloading pricing catalog");
        // Failures are logged by the handle; the previous catalog stays active.
        let _ = service.catalog().reload_from_path(&path);
    }
}

#[cfg(not(unix))]
async fn reload_on_hangup(_service: EstimationService, _path: PathBuf) {}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use domain_imagery_pricing::PricingCatalog;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn json_body(body: Body) -> Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn test_app() -> Router {
        app(EstimationService::new(PricingCatalog::builtin().unwrap()))
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_openapi_document_lists_nested_paths() {
        let response = test_app()
            .oneshot(
                Request::get("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response.into_body()).await;
        assert!(body["paths"]["/api/estimate"]["post"].is_object());
        assert!(body["paths"]["/api/cost-table"]["get"].is_object());
    }

    #[tokio::test]
    async fn test_api_is_nested() {
        let response = test_app()
            .oneshot(Request::get("/api/resources").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = test_app()
            .oneshot(Request::get("/resources").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["code"], 404);
    }

    #[tokio::test]
    async fn test_metrics_endpoint_without_recorder() {
        let response = test_app()
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
