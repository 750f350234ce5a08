//! Receipt email and printable receipts.

use crate::{
    api::{
        email::EmailMessage,
        types::{OkResponse, ReceiptFormat, ReceiptQuery, SendReceiptEmailRequest},
        ApiError, AppState,
    },
    wash::{receipt::Receipt, Wash},
};
use axum::{
    extract::{rejection::QueryRejection, Extension, Path, Query},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Render `wash` as an email and hand it to the configured sender.
pub(crate) async fn deliver_receipt(
    state: &AppState,
    wash: &Wash,
    to: &str,
    business_name: &str,
) -> Result<(), ApiError> {
    let sender = state.email().ok_or(ApiError::EmailNotConfigured)?;
    let receipt = Receipt::new(wash, business_name, state.offset());

    let message = EmailMessage {
        to: to.to_string(),
        subject: receipt.subject(),
        text: receipt.text(),
    };
    sender.send(&message).await?;

    info!(wash_id = %wash.id, to_email = %to, "receipt emailed");
    Ok(())
}

#[utoipa::path(
    post,
    path = "/sendReceiptEmail",
    request_body = SendReceiptEmailRequest,
    responses(
        (status = 200, description = "Receipt emailed.", body = OkResponse),
        (status = 400, description = "Missing washId or to."),
        (status = 404, description = "Wash not found."),
        (status = 500, description = "Email not configured or delivery failed."),
    ),
    tag = "receipts"
)]
/// Email a wash receipt. The business name defaults to the stored settings.
#[instrument(skip(state, payload))]
pub async fn send_receipt_email(
    Extension(state): Extension<Arc<AppState>>,
    payload: Option<Json<SendReceiptEmailRequest>>,
) -> Result<Json<OkResponse>, ApiError> {
    if state.email().is_none() {
        return Err(ApiError::EmailNotConfigured);
    }

    let request = payload.map(|Json(request)| request).unwrap_or_default();
    let (Some(wash_id), Some(to)) = (non_blank(request.wash_id), non_blank(request.to)) else {
        return Err(ApiError::BadRequest("Missing washId or to"));
    };

    let wash = state.store().get(&wash_id).await?.ok_or(ApiError::NotFound)?;

    let business_name = match non_blank(request.business_name) {
        Some(name) => name,
        None => state.store().settings().await?.business_name,
    };

    deliver_receipt(&state, &wash, &to, &business_name).await?;

    Ok(Json(OkResponse { ok: true }))
}

#[utoipa::path(
    get,
    path = "/receipts/{id}",
    params(
        ("id" = String, Path, description = "Wash id"),
        ReceiptQuery,
    ),
    responses(
        (status = 200, description = "Printable receipt.", body = String, content_type = "text/html"),
        (status = 404, description = "Wash not found."),
    ),
    tag = "receipts"
)]
/// Render a receipt as printable HTML, or plain text with `?format=text`.
#[instrument(skip(state))]
pub async fn receipt(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
    query: Result<Query<ReceiptQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let wash = state.store().get(&id).await?.ok_or(ApiError::NotFound)?;
    let settings = state.store().settings().await?;
    let receipt = Receipt::new(&wash, &settings.business_name, state.offset());

    let response = match query.format.unwrap_or_default() {
        ReceiptFormat::Html => (
            [(CONTENT_TYPE, "text/html; charset=utf-8")],
            receipt.html(),
        )
            .into_response(),
        ReceiptFormat::Text => (
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            receipt.text(),
        )
            .into_response(),
    };

    Ok(response)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
