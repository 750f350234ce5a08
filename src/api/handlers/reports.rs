//! Dashboard summary and CSV export.

use crate::{
    api::{types::SummaryQuery, ApiError, AppState},
    wash::{
        now_ms,
        report::{self, Summary},
    },
};
use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::instrument;

#[utoipa::path(
    get,
    path = "/reports/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Daily counts and revenue by method.", body = Summary),
    ),
    tag = "reports"
)]
#[instrument(skip(state))]
pub async fn summary(
    Extension(state): Extension<Arc<AppState>>,
    query: Result<Query<SummaryQuery>, QueryRejection>,
) -> Result<Json<Summary>, ApiError> {
    let Query(query) = query?;
    let washes = state.store().list().await?;
    Ok(Json(report::summary(
        &washes,
        query.range.unwrap_or_default(),
        now_ms(),
        state.offset(),
    )))
}

#[utoipa::path(
    get,
    path = "/reports/washes.csv",
    responses(
        (status = 200, description = "Every wash as CSV.", body = String, content_type = "text/csv"),
    ),
    tag = "reports"
)]
#[instrument(skip(state))]
pub async fn export_csv(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let washes = state.store().list().await?;
    let body = report::csv(&washes, state.offset());

    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8"),
            (CONTENT_DISPOSITION, "attachment; filename=\"washes.csv\""),
        ],
        body,
    ))
}
