use crate::server::AppState;
use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeParams {
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: String,
}

impl ErrorResponse {
    fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }

    fn missing_url() -> Self {
        Self {
            error: "URL parameter is required".to_string(),
            details: "Please provide a valid URL to analyze".to_string(),
        }
    }

    fn cancelled() -> Self {
        Self {
            error: "Request cancelled".to_string(),
            details: "The analysis request was cancelled / timed out".to_string(),
        }
    }

    fn analysis_failed(details: String) -> Self {
        Self {
            error: "Analysis failed".to_string(),
            details,
        }
    }
}

/// `GET /api/v1/analyze?url=...` and its legacy alias.
///
/// If the client goes away the handler future is dropped, and with it the
/// analysis, which cancels every outstanding link check.
pub async fn analyze_handler(
    State(state): State<AppState>,
    params: Result<Query<AnalyzeParams>, QueryRejection>,
) -> Response {
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => {
            debug!("Rejected analyze query: {}", rejection);
            return ErrorResponse::missing_url().into_response_with(StatusCode::BAD_REQUEST);
        }
    };

    let url = match params.url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => return ErrorResponse::missing_url().into_response_with(StatusCode::BAD_REQUEST),
    };

    // Never cancelled here; a disconnect drops the future instead.
    let cancel = CancellationToken::new();
    let analysis = state.service.execute_analysis(&url, &cancel);

    match tokio::time::timeout(state.request_timeout, analysis).await {
        Ok(Ok(report)) => (StatusCode::OK, Json(report)).into_response(),
        Ok(Err(e)) => {
            ErrorResponse::analysis_failed(e.to_string()).into_response_with(StatusCode::BAD_REQUEST)
        }
        Err(_) => {
            warn!("Analysis of {} exceeded the request budget", url);
            ErrorResponse::cancelled().into_response_with(StatusCode::REQUEST_TIMEOUT)
        }
    }
}

pub async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "time": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.service.metrics().gather_text() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
