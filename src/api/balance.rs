//! Balance, withdrawal and withdrawal-history handlers

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Response;
use axum::{Extension, Json};
use http::StatusCode;

use crate::error::AppError;
use crate::models::{Balance, Claims, WithdrawRequest};
use crate::service::balance;
use crate::state::AppState;

use super::list_response;

/// GET /api/user/balance
pub async fn get(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Balance>, AppError> {
    let balance = balance::get(&state, &claims).await?;
    Ok(Json(balance))
}

/// POST /api/user/balance/withdraw
pub async fn withdraw(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<WithdrawRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(request) = payload.map_err(|e| AppError::validation(e.body_text()))?;
    balance::withdraw(&state, &claims, &request).await?;
    Ok(StatusCode::OK)
}

/// GET /api/user/withdrawals
pub async fn withdrawals(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, AppError> {
    let list = balance::withdrawals(&state, &claims).await?;
    Ok(list_response(list))
}
