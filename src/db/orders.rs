use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::{Order, OrderStatus};

/// Outcome of an admission attempt for one order number
#[derive(Debug)]
pub struct OrderAdmission {
    /// Owner after the call: the caller on insert, the earlier uploader otherwise
    pub owner_id: i32,
    pub status: OrderStatus,
    pub was_inserted: bool,
}

/// An order the reconciliation loop still has to drive to a terminal state
#[derive(Debug, Clone, sqlx::FromRow)]
#[allow(dead_code)]
pub struct UnfinishedOrder {
    pub order_number: i64,
    pub status: String,
}

/// Idempotent admission: insert the order as `NEW`, or report the existing
/// row untouched. Concurrent callers for the same number converge on one
/// persisted owner: the conflicting insert waits on the in-flight row and
/// then reads whatever committed.
pub async fn upsert(pool: &PgPool, user_id: i32, number: i64) -> Result<OrderAdmission, AppError> {
    let mut tx = pool.begin().await?;

    let inserted: Option<(i32,)> = sqlx::query_as(
        "INSERT INTO orders (order_number, user_id, status)
         VALUES ($1, $2, 'NEW')
         ON CONFLICT (order_number) DO NOTHING
         RETURNING user_id",
    )
    .bind(number)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let admission = match inserted {
        Some(_) => OrderAdmission {
            owner_id: user_id,
            status: OrderStatus::New,
            was_inserted: true,
        },
        None => {
            let (owner_id, status): (i32, String) =
                sqlx::query_as("SELECT user_id, status FROM orders WHERE order_number = $1")
                    .bind(number)
                    .fetch_one(&mut *tx)
                    .await?;
            OrderAdmission {
                owner_id,
                status: parse_status(&status)?,
                was_inserted: false,
            }
        }
    };

    tx.commit().await?;
    Ok(admission)
}

/// All orders with status `NEW` or `PROCESSING`, in no particular order
pub async fn list_unfinished(pool: &PgPool) -> Result<Vec<UnfinishedOrder>, AppError> {
    let orders = sqlx::query_as(
        "SELECT order_number, status FROM orders WHERE status IN ('NEW', 'PROCESSING')",
    )
    .fetch_all(pool)
    .await?;
    Ok(orders)
}

/// Transition an order to a terminal state. Rows already terminal are left
/// untouched, so duplicate writes from re-enqueued orders are no-ops.
pub async fn apply_accrual_result(
    pool: &PgPool,
    number: i64,
    status: OrderStatus,
    accrual: Option<Decimal>,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE orders SET status = $2, accrual = $3
         WHERE order_number = $1 AND status IN ('NEW', 'PROCESSING')",
    )
    .bind(number)
    .bind(status.as_db())
    .bind(accrual)
    .execute(pool)
    .await?;
    Ok(())
}

/// The user's uploaded orders, newest first
pub async fn list_for_user(pool: &PgPool, user_id: i32) -> Result<Vec<Order>, AppError> {
    let rows: Vec<(i64, String, Option<Decimal>, DateTime<Utc>)> = sqlx::query_as(
        "SELECT order_number, status, accrual, uploaded_at
         FROM orders WHERE user_id = $1 ORDER BY uploaded_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(number, status, accrual, uploaded_at)| {
            Ok(Order {
                number,
                status: parse_status(&status)?,
                accrual,
                uploaded_at,
            })
        })
        .collect()
}

fn parse_status(raw: &str) -> Result<OrderStatus, AppError> {
    OrderStatus::from_db(raw)
        .ok_or_else(|| AppError::internal(format!("unknown order status in store: {raw}")))
}
