use sqlx::PgPool;

use crate::error::AppError;
use crate::models::User;

pub async fn exists(pool: &PgPool, login: &str) -> Result<bool, AppError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT login FROM users WHERE login = $1")
        .bind(login)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// Insert a new user. A duplicate login surfaces as [`AppError::login_taken`]
/// even when two registrations race past the existence check; the unique
/// index on `login` is the arbiter.
pub async fn create(pool: &PgPool, login: &str, password_hash: &str) -> Result<i32, AppError> {
    let row: (i32,) =
        sqlx::query_as("INSERT INTO users (login, password_hash) VALUES ($1, $2) RETURNING id")
            .bind(login)
            .bind(password_hash)
            .fetch_one(pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => AppError::login_taken(),
                _ => AppError::from(e),
            })?;
    Ok(row.0)
}

pub async fn find_by_login(pool: &PgPool, login: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as("SELECT id, login, password_hash FROM users WHERE login = $1")
        .bind(login)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}
