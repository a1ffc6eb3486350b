use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::Withdrawal;

/// Conditional insert: append the withdrawal only if the user's balance
/// covers it.
///
/// The `FOR UPDATE` on the user row serializes concurrent withdrawals for
/// the same user, so the balance read inside the transaction is the one the
/// insert commits against. Shortfall rolls the transaction back.
pub async fn insert(
    pool: &PgPool,
    user_id: i32,
    order_number: i64,
    amount: Decimal,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

    let (accrued, withdrawn): (Decimal, Decimal) = sqlx::query_as(
        "SELECT
           (SELECT COALESCE(SUM(accrual), 0) FROM orders
             WHERE user_id = $1 AND status = 'PROCESSED'),
           (SELECT COALESCE(SUM(amount), 0) FROM withdrawals
             WHERE user_id = $1)",
    )
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    if accrued - withdrawn < amount {
        return Err(AppError::insufficient_funds());
    }

    sqlx::query("INSERT INTO withdrawals (user_id, order_number, amount) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(order_number)
        .bind(amount)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// The user's withdrawals, newest first
pub async fn list_for_user(pool: &PgPool, user_id: i32) -> Result<Vec<Withdrawal>, AppError> {
    let rows: Vec<(i64, Decimal, DateTime<Utc>)> = sqlx::query_as(
        "SELECT order_number, amount, processed_at
         FROM withdrawals WHERE user_id = $1 ORDER BY processed_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(order, sum, processed_at)| Withdrawal {
            order,
            sum,
            processed_at,
        })
        .collect())
}
