use crate::server::ApiState;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::{Json, response::IntoResponse};
use quill_derive::{api_handler, api_model};
use quill_domain::constants::SYSTEM_TAG;
use std::sync::LazyLock;
use std::time::Instant;
use tracing::warn;

#[api_model]
/// Health check response
struct HealthResponse {
    /// `up` when every dependency answers, `degraded` otherwise
    status: &'static str,
    /// Version
    version: &'static str,
    /// Uptime in seconds
    uptime: u64,
    /// `up` or `down`
    database: &'static str,
    /// Active media backend (`cloudinary`, `memory` or `disabled`)
    media: &'static str,
}

static START_TIME: LazyLock<Instant> = LazyLock::new(Instant::now);

#[api_handler(
    get,
    path = "/health",
    responses(
        (status = OK, description = "Service and database are up", body = HealthResponse),
        (status = SERVICE_UNAVAILABLE, description = "Database is unreachable", body = HealthResponse),
    ),
    tag = SYSTEM_TAG,
)]
pub(super) async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let database_up = match state.database.health().await {
        Ok(()) => true,
        Err(error) => {
            warn!(%error, "Database health check failed");
            false
        }
    };

    let body = HealthResponse {
        status: if database_up { "up" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime: START_TIME.elapsed().as_secs(),
        database: if database_up { "up" } else { "down" },
        media: state.media.kind(),
    };
    let status = if database_up { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status,
        [
            (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(body),
    )
}
