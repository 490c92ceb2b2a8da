use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Json;

use common::types::Health;

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Prometheus text exposition of the service counters.
pub async fn metrics() -> impl IntoResponse {
    ([(CONTENT_TYPE, prometheus::TEXT_FORMAT)], service::metrics::render())
}
