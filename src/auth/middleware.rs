//! Cookie-based auth middleware for the protected route group

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use http::HeaderMap;
use http::header::COOKIE;

use crate::auth::{AUTH_COOKIE, jwt};
use crate::error::AppError;
use crate::state::AppState;

/// Verify the `auth_token` cookie and stash [`crate::models::Claims`] in the
/// request extensions. Missing or invalid tokens end the request with 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = cookie_value(request.headers(), AUTH_COOKIE)
        .ok_or_else(AppError::unauthorized)?;

    let claims = jwt::verify_token(&token, &state.jwt_secret).map_err(|e| {
        tracing::debug!(error = %e, "session token rejected");
        AppError::unauthorized()
    })?;

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Extract a single cookie value from the `Cookie` header
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}
