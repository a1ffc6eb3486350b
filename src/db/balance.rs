use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::error::AppError;

/// `(accrued, withdrawn)` for one user in a single query. Accrual of
/// non-PROCESSED orders contributes nothing; NULL sums collapse to zero.
pub async fn get(pool: &PgPool, user_id: i32) -> Result<(Decimal, Decimal), AppError> {
    let sums = sqlx::query_as(
        "SELECT
           (SELECT COALESCE(SUM(accrual), 0) FROM orders
             WHERE user_id = $1 AND status = 'PROCESSED'),
           (SELECT COALESCE(SUM(amount), 0) FROM withdrawals
             WHERE user_id = $1)",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(sums)
}
