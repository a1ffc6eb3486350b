//! Registration and login

use crate::auth::{jwt, password};
use crate::db;
use crate::error::AppError;
use crate::models::Credentials;
use crate::state::AppState;

/// A freshly minted session for the cookie boundary
pub struct Session {
    pub token: String,
    pub expires_hours: i64,
}

pub async fn register(state: &AppState, creds: &Credentials) -> Result<Session, AppError> {
    validate_credentials(creds)?;

    if db::users::exists(&state.pool, &creds.login).await? {
        return Err(AppError::login_taken());
    }

    let hash = password::hash_password(&creds.password).map_err(|e| {
        tracing::error!(error = %e, "password hashing failed");
        AppError::internal("password hashing failed")
    })?;

    // Two racing registrations can both pass the existence check; the store
    // turns the losing insert into `login_taken`.
    let user_id = db::users::create(&state.pool, &creds.login, &hash).await?;

    tracing::info!(login = %creds.login, user_id, "user registered");
    mint_session(state, user_id, &creds.login)
}

pub async fn login(state: &AppState, creds: &Credentials) -> Result<Session, AppError> {
    validate_credentials(creds)?;

    let user = db::users::find_by_login(&state.pool, &creds.login)
        .await?
        .ok_or_else(AppError::unauthorized)?;

    if !password::verify_password(&creds.password, &user.password_hash) {
        tracing::warn!(login = %creds.login, "login attempt with wrong password");
        return Err(AppError::unauthorized());
    }

    mint_session(state, user.id, &user.login)
}

fn mint_session(state: &AppState, user_id: i32, login: &str) -> Result<Session, AppError> {
    let token = jwt::create_token(user_id, login, &state.jwt_secret, state.jwt_expires)
        .map_err(|e| {
            tracing::error!(error = %e, "token minting failed");
            AppError::internal("token minting failed")
        })?;
    Ok(Session {
        token,
        expires_hours: state.jwt_expires,
    })
}

fn validate_credentials(creds: &Credentials) -> Result<(), AppError> {
    if creds.login.is_empty() || creds.password.is_empty() {
        return Err(AppError::validation("login and password must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn empty_credentials_are_rejected() {
        let empty_login = Credentials {
            login: String::new(),
            password: "pw".into(),
        };
        assert_eq!(
            validate_credentials(&empty_login).unwrap_err().code,
            ErrorCode::Validation
        );

        let empty_password = Credentials {
            login: "alice".into(),
            password: String::new(),
        };
        assert!(validate_credentials(&empty_password).is_err());
    }

    #[test]
    fn filled_credentials_pass() {
        let creds = Credentials {
            login: "alice".into(),
            password: "pw".into(),
        };
        assert!(validate_credentials(&creds).is_ok());
    }
}
