//! Order upload and listing handlers

use axum::Extension;
use axum::extract::State;
use axum::response::Response;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode};

use crate::error::AppError;
use crate::models::Claims;
use crate::service::orders::{self, Admission};
use crate::state::AppState;

use super::list_response;

/// POST /api/user/orders, plain-text body holding one order number
pub async fn upload(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, AppError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !content_type.starts_with("text/plain") {
        return Err(AppError::validation("expected Content-Type: text/plain"));
    }

    match orders::admit(&state, &claims, &body).await? {
        Admission::Accepted => Ok(StatusCode::ACCEPTED),
        Admission::AlreadyUploaded => Ok(StatusCode::OK),
    }
}

/// GET /api/user/orders
pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, AppError> {
    let orders = orders::list(&state, &claims).await?;
    Ok(list_response(orders))
}
