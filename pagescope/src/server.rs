use crate::handlers::{analyze_handler, health_handler, metrics_handler};
use axum::Router;
use axum::extract::Request;
use axum::http::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use pagescope_core::{AnalysisService, ServiceConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);
const CORS_MAX_AGE: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AnalysisService>,
    /// Upper bound on one analyze request, on top of the analysis deadline.
    pub request_timeout: Duration,
}

/// Correlation id attached to every request.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([ORIGIN, CONTENT_TYPE, ACCEPT])
        .expose_headers([CONTENT_LENGTH])
        .max_age(CORS_MAX_AGE);

    Router::new()
        .route("/api/v1/analyze", get(analyze_handler))
        .route("/url_analyze", get(analyze_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(log_requests))
        .layer(middleware::from_fn(assign_request_id))
        .layer(cors)
        .with_state(state)
}

/// Loopback-only router for health checks and scraping.
pub fn create_debug_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn assign_request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut response = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    let start = Instant::now();

    let response = next.run(req).await;

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "request completed"
    );
    response
}

/// Serve the public and debug listeners until SIGINT or SIGTERM.
pub async fn run_server(config: &ServiceConfig, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    let debug_listener = TcpListener::bind(("127.0.0.1", config.debug_port)).await?;
    info!(
        "Listening on {} (debug on {})",
        listener.local_addr()?,
        debug_listener.local_addr()?
    );

    let shutdown = CancellationToken::new();

    let public = {
        let shutdown = shutdown.clone();
        let app = create_app(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
        })
    };
    let debug = {
        let shutdown = shutdown.clone();
        let app = create_debug_app(state);
        tokio::spawn(async move {
            axum::serve(debug_listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
        })
    };

    shutdown_signal().await;
    info!("Shutdown signal received, draining connections");
    shutdown.cancel();

    match tokio::time::timeout(SHUTDOWN_GRACE, async { (public.await, debug.await) }).await {
        Ok((public, debug)) => {
            public??;
            debug??;
            info!("Server stopped");
        }
        Err(_) => warn!("Connections still open after {:?}, exiting", SHUTDOWN_GRACE),
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
