use crate::{
    api::{ApiError, AppState},
    wash::{Settings, SettingsPatch},
};
use axum::{extract::Extension, Json};
use std::sync::Arc;
use tracing::{info, instrument};

#[utoipa::path(
    get,
    path = "/settings",
    responses(
        (status = 200, description = "Business settings.", body = Settings),
    ),
    tag = "settings"
)]
#[instrument(skip(state))]
pub async fn get_settings(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Settings>, ApiError> {
    Ok(Json(state.store().settings().await?))
}

#[utoipa::path(
    put,
    path = "/settings",
    request_body = SettingsPatch,
    responses(
        (status = 200, description = "Settings after the merge.", body = Settings),
        (status = 400, description = "Invalid input."),
    ),
    tag = "settings"
)]
/// Merge the provided fields into the stored settings.
#[instrument(skip(state, payload))]
pub async fn put_settings(
    Extension(state): Extension<Arc<AppState>>,
    payload: Option<Json<SettingsPatch>>,
) -> Result<Json<Settings>, ApiError> {
    let Some(Json(patch)) = payload else {
        return Err(ApiError::BadRequest("Missing payload"));
    };
    patch.validate().map_err(ApiError::BadRequest)?;

    let settings = state.store().update_settings(patch).await?;
    info!(business_name = %settings.business_name, "settings updated");

    Ok(Json(settings))
}
