//! Registration and login handlers
//!
//! Both bind the minted session token into the `auth_token` cookie and
//! answer with a plain `OK` body.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use http::header::SET_COOKIE;

use crate::auth::session_cookie;
use crate::error::AppError;
use crate::models::Credentials;
use crate::service::users::{self, Session};
use crate::state::AppState;

/// POST /api/user/register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(creds) = payload.map_err(bad_json)?;
    let session = users::register(&state, &creds).await?;
    Ok(session_response(session))
}

/// POST /api/user/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(creds) = payload.map_err(bad_json)?;
    let session = users::login(&state, &creds).await?;
    Ok(session_response(session))
}

fn bad_json(rejection: JsonRejection) -> AppError {
    AppError::validation(rejection.body_text())
}

fn session_response(session: Session) -> Response {
    (
        [(
            SET_COOKIE,
            session_cookie(&session.token, session.expires_hours),
        )],
        "OK",
    )
        .into_response()
}
