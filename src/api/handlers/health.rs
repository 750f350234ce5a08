//! Health probe.

use crate::{api::AppState, GIT_COMMIT_HASH};
use axum::{
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, warn};
use utoipa::ToSchema;

const HEALTH_STORE_TIMEOUT_SECONDS: u64 = 2;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    store: String,
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Store is reachable", body = Health),
        (status = 503, description = "Store is unreachable", body = Health)
    ),
    tag = "health",
)]
/// Report build information and whether the wash store answers.
pub async fn health(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    let store_healthy = match timeout(
        Duration::from_secs(HEALTH_STORE_TIMEOUT_SECONDS),
        state.store().ping(),
    )
    .await
    {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            error!("Store ping failed: {err:#}");
            false
        }
        Err(_) => {
            warn!("Store health check timed out");
            false
        }
    };

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: if store_healthy { "ok" } else { "error" }.to_string(),
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        })
        .map_err(|err| {
            debug!("Failed to parse X-App header: {}", err);
        })
        .unwrap_or_else(|()| HeaderMap::new());

    let status = if store_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, headers, Json(health))
}
