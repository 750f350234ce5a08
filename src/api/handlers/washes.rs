//! Wash logging and lookup.

use crate::{
    api::{
        types::{CreateWashResponse, ListQuery},
        ApiError, AppState,
    },
    wash::{
        catalog::{catalog, ServiceItem},
        model::MISSING_FIELDS,
        CreateWashRequest, NewWash, Wash,
    },
};
use axum::{
    extract::{rejection::QueryRejection, Extension, Path, Query},
    Json,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[utoipa::path(
    post,
    path = "/createWash",
    request_body = CreateWashRequest,
    responses(
        (status = 200, description = "Wash stored.", body = CreateWashResponse),
        (status = 400, description = "Missing or invalid fields."),
        (status = 500, description = "Server error."),
    ),
    tag = "washes"
)]
/// Validate and store a new, unpaid wash.
#[instrument(skip(state, payload))]
pub async fn create_wash(
    Extension(state): Extension<Arc<AppState>>,
    payload: Option<Json<CreateWashRequest>>,
) -> Result<Json<CreateWashResponse>, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::BadRequest(MISSING_FIELDS));
    };

    let new_wash = NewWash::validate(request).map_err(ApiError::BadRequest)?;
    debug!("new wash: {:?}", new_wash);

    let wash = state.store().insert(new_wash).await?;
    info!(wash_id = %wash.id, plate = %wash.plate, "wash logged");

    Ok(Json(CreateWashResponse {
        ok: true,
        id: wash.id,
    }))
}

#[utoipa::path(
    get,
    path = "/washes",
    params(ListQuery),
    responses(
        (status = 200, description = "Washes, most recent first.", body = [Wash]),
    ),
    tag = "washes"
)]
/// List washes, optionally filtered by a search query.
#[instrument(skip(state))]
pub async fn list_washes(
    Extension(state): Extension<Arc<AppState>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Wash>>, ApiError> {
    let Query(query) = query?;
    let search = query.q.unwrap_or_default();
    let washes: Vec<Wash> = state
        .store()
        .list()
        .await?
        .into_iter()
        .filter(|wash| wash.matches(&search))
        .take(query.limit.unwrap_or(usize::MAX))
        .collect();

    Ok(Json(washes))
}

#[utoipa::path(
    get,
    path = "/washes/{id}",
    params(("id" = String, Path, description = "Wash id")),
    responses(
        (status = 200, description = "Wash detail.", body = Wash),
        (status = 404, description = "Wash not found."),
    ),
    tag = "washes"
)]
#[instrument(skip(state))]
pub async fn get_wash(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Wash>, ApiError> {
    state
        .store()
        .get(&id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

#[utoipa::path(
    get,
    path = "/services",
    responses(
        (status = 200, description = "Service price list.", body = [ServiceItem]),
    ),
    tag = "washes"
)]
pub async fn service_catalog() -> Json<Vec<ServiceItem>> {
    Json(catalog())
}
