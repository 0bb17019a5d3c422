//! Transfer handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use moneybee_engine::CreateTransferRequest;

use crate::dto::{
    ApiResponse, CancelTransferBody, CompleteTransferBody, CreateTransferBody, DailyLimitView,
    ReconcileBody, ReconcileView, TransferView,
};
use crate::error::ApiResult;
use crate::state::AppState;

/// Header carrying the caller's idempotency key on Create
pub const IDEMPOTENCY_HEADER: &str = "X-Idempotency-Key";

/// `POST /api/transfers`
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateTransferBody>,
) -> ApiResult<(StatusCode, Json<ApiResponse<TransferView>>)> {
    body.validate()?;

    let idempotency_key = headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let transfer = state
        .engine
        .create(
            CreateTransferRequest {
                sender_national_id: body.sender_national_id,
                receiver_national_id: body.receiver_national_id,
                amount: body.amount,
                currency: body.currency,
                description: body.description,
            },
            idempotency_key,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(transfer.into())),
    ))
}

/// `POST /api/transfers/{code}/complete`
pub async fn complete_transfer(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(body): Json<CompleteTransferBody>,
) -> ApiResult<Json<ApiResponse<TransferView>>> {
    let transfer = state
        .engine
        .complete(&code, &body.receiver_national_id)
        .await?;

    Ok(Json(ApiResponse::ok(transfer.into())))
}

/// `POST /api/transfers/{code}/cancel`
pub async fn cancel_transfer(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    body: Option<Json<CancelTransferBody>>,
) -> ApiResult<Json<ApiResponse<TransferView>>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let transfer = state.engine.cancel(&code, body.reason).await?;

    Ok(Json(ApiResponse::ok(transfer.into())))
}

/// `GET /api/transfers/{code}`
pub async fn get_transfer(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<Json<ApiResponse<TransferView>>> {
    let transfer = state.engine.get_by_code(&code).await?;
    Ok(Json(ApiResponse::ok(transfer.into())))
}

/// `GET /api/transfers/customer/{customer_id}`: most recent first,
/// capped at 50
pub async fn customer_transfers(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<TransferView>>>> {
    let transfers = state.engine.customer_transfers(customer_id).await?;
    Ok(Json(ApiResponse::ok(
        transfers.into_iter().map(TransferView::from).collect(),
    )))
}

/// `GET /api/transfers/daily-limit/{customer_id}`
pub async fn daily_limit(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<DailyLimitView>>> {
    let status = state.engine.daily_limit(customer_id).await?;
    Ok(Json(ApiResponse::ok(status.into())))
}

/// `POST /api/transfers/reconcile/{customer_id}`: manual sweep for a
/// customer whose block/delete event may have been missed
pub async fn reconcile_customer(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<Uuid>,
    body: Option<Json<ReconcileBody>>,
) -> ApiResult<Json<ApiResponse<ReconcileView>>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    body.validate()?;

    let cancelled = state
        .reactor
        .reconcile_customer(customer_id, body.reason)
        .await?;

    Ok(Json(ApiResponse::ok_with_message(
        ReconcileView { cancelled },
        format!("cancelled {} pending transfer(s)", cancelled),
    )))
}
