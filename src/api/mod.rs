pub mod error;
pub mod outfit;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Router,
};

use crate::intake::MAX_UPLOAD_BYTES;
use crate::workflow::AnalysisWorkflow;

pub use error::ApiError;

/// Room for the largest allowed image plus the text fields and multipart framing.
pub const MAX_BODY_BYTES: usize = MAX_UPLOAD_BYTES + 2 * 1024 * 1024;

async fn health_check() -> &'static str {
    "OK"
}

/// Application routes. `/metrics` is mounted by the server binary.
pub fn router(workflow: Arc<AnalysisWorkflow>, cors_origin: &str) -> Router {
    let router = Router::new()
        .route("/", get(outfit::form_options))
        .route("/health", get(health_check))
        .route("/analyze", post(outfit::analyze_outfit))
        .route("/result/:id", get(outfit::get_result))
        .route("/admin/analyses", get(outfit::list_analyses))
        .layer(Extension(workflow))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<axum::body::Body>| {
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched| matched.as_str());

                    // "METHOD /path", e.g. "POST /analyze"
                    let span_name = if let Some(path) = matched_path {
                        format!("{} {}", request.method(), path)
                    } else {
                        format!("{} {}", request.method(), request.uri().path())
                    };

                    let user_ip = request
                        .headers()
                        .get("x-forwarded-for")
                        .and_then(|v| v.to_str().ok())
                        .or_else(|| {
                            request
                                .headers()
                                .get("x-real-ip")
                                .and_then(|v| v.to_str().ok())
                        })
                        .unwrap_or("unknown");

                    // Handlers fill in the empty fields
                    tracing::info_span!(
                        "request",
                        "otel.name" = span_name,
                        user_ip = user_ip,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        action = tracing::field::Empty,
                        analysis_id = tracing::field::Empty,
                        business_event = tracing::field::Empty,
                        error = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency = tracing::field::Empty,
                    )
                })
                .on_request(|_request: &axum::http::Request<axum::body::Body>, _span: &tracing::Span| {})
                .on_response(
                    |response: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                        span.record("status", tracing::field::display(response.status()));
                        span.record("latency", tracing::field::debug(latency));
                        tracing::info!("request completed");
                    },
                ),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    match cors_origin.parse::<axum::http::HeaderValue>() {
        Ok(origin) => router.layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers([axum::http::header::CONTENT_TYPE])
                .allow_credentials(true),
        ),
        Err(_) => {
            tracing::warn!("Ignoring invalid CORS origin {:?}", cors_origin);
            router
        }
    }
}
