//! Settling washes.
//!
//! A wash is settled either by the attendant (`/markPaid`) or by the M-Pesa
//! callback. Both go through `settle`, which assigns a receipt number on the
//! first settlement only and, when the business has auto-email enabled, sends
//! the receipt in the background.

use super::receipts::deliver_receipt;
use crate::{
    api::{
        types::{MarkPaidRequest, MarkPaidResponse, MpesaCallback, OkResponse},
        ApiError, AppState,
    },
    wash::{now_ms, receipt::receipt_number, PaymentOutcome},
};
use axum::{extract::Extension, Json};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

const MPESA_SUCCESS: &str = "SUCCESS";

/// Mark `id` paid. `None` when the wash does not exist.
pub(crate) async fn settle(
    state: &Arc<AppState>,
    id: &str,
) -> Result<Option<PaymentOutcome>, ApiError> {
    let receipt_no = receipt_number(now_ms());
    let Some(outcome) = state.store().mark_paid(id, &receipt_no).await? else {
        return Ok(None);
    };

    if outcome.newly_paid {
        info!(
            wash_id = %outcome.wash.id,
            receipt_no = outcome.wash.receipt_no.as_deref().unwrap_or_default(),
            "wash paid"
        );
        spawn_auto_email(state, &outcome);
    }

    Ok(Some(outcome))
}

fn spawn_auto_email(state: &Arc<AppState>, outcome: &PaymentOutcome) {
    if state.email().is_none() {
        return;
    }

    let state = Arc::clone(state);
    let wash = outcome.wash.clone();
    tokio::spawn(async move {
        let settings = match state.store().settings().await {
            Ok(settings) => settings,
            Err(err) => {
                error!("Failed to load settings for auto email: {err:#}");
                return;
            }
        };

        let Some(to) = settings.auto_email_recipient() else {
            return;
        };

        if let Err(err) = deliver_receipt(&state, &wash, to, &settings.business_name).await {
            warn!(wash_id = %wash.id, "Auto receipt email failed: {err:?}");
        }
    });
}

#[utoipa::path(
    post,
    path = "/markPaid",
    request_body = MarkPaidRequest,
    responses(
        (status = 200, description = "Wash paid; the receipt number is kept on repeated calls.", body = MarkPaidResponse),
        (status = 400, description = "Missing id."),
        (status = 404, description = "Wash not found."),
    ),
    tag = "payments"
)]
/// Mark a wash paid and return its receipt number.
#[instrument(skip(state, payload))]
pub async fn mark_paid(
    Extension(state): Extension<Arc<AppState>>,
    payload: Option<Json<MarkPaidRequest>>,
) -> Result<Json<MarkPaidResponse>, ApiError> {
    let id = payload
        .and_then(|Json(request)| request.id)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or(ApiError::BadRequest("Missing id"))?;

    let outcome = settle(&state, &id).await?.ok_or(ApiError::NotFound)?;
    let receipt_no = outcome.wash.receipt_no.clone().unwrap_or_default();

    Ok(Json(MarkPaidResponse {
        ok: true,
        id,
        receipt_no,
        data: Some(outcome.wash),
    }))
}

#[utoipa::path(
    post,
    path = "/mpesaCallback",
    request_body = MpesaCallback,
    responses(
        (status = 200, description = "Callback accepted.", body = OkResponse),
        (status = 400, description = "Missing orderId."),
    ),
    tag = "payments"
)]
/// Payment provider callback. `orderId` is the wash id; only `SUCCESS`
/// settles the wash. Unknown orders are acknowledged so the provider does not
/// retry them.
#[instrument(skip(state, payload))]
pub async fn mpesa_callback(
    Extension(state): Extension<Arc<AppState>>,
    payload: Option<Json<MpesaCallback>>,
) -> Result<Json<OkResponse>, ApiError> {
    let callback = payload.map(|Json(callback)| callback).unwrap_or_default();
    let order_id = callback
        .order_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or(ApiError::BadRequest("Missing orderId"))?;

    match callback.status.as_deref() {
        Some(MPESA_SUCCESS) => {
            if settle(&state, &order_id).await?.is_none() {
                warn!(order_id = %order_id, "M-Pesa callback for unknown wash");
            }
        }
        status => {
            info!(order_id = %order_id, ?status, "M-Pesa callback without success");
        }
    }

    Ok(Json(OkResponse { ok: true }))
}
