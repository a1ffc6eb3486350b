//! Shared application state for the HTTP surface

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::Config;

/// Deadline for the first database connection at startup
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool, shared with the reconciliation pool
    pub pool: PgPool,
    /// JWT signing secret
    pub jwt_secret: String,
    /// Session lifetime in hours
    pub jwt_expires: i64,
}

impl AppState {
    /// Connect to PostgreSQL and run the embedded migrations
    pub async fn new(config: &Config) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let pool = PgPoolOptions::new()
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect(&config.database)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self {
            pool,
            jwt_secret: config.jwt_secret.clone(),
            jwt_expires: config.jwt_expires,
        })
    }
}
