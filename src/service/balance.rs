//! Balance reads and gated withdrawal

use rust_decimal::Decimal;

use crate::db;
use crate::error::AppError;
use crate::luhn;
use crate::models::{Balance, Claims, WithdrawRequest, Withdrawal};
use crate::state::AppState;

pub async fn get(state: &AppState, claims: &Claims) -> Result<Balance, AppError> {
    let (accrued, withdrawn) = db::balance::get(&state.pool, claims.user_id).await?;
    Ok(Balance::new(accrued, withdrawn))
}

pub async fn withdraw(
    state: &AppState,
    claims: &Claims,
    request: &WithdrawRequest,
) -> Result<(), AppError> {
    if request.sum <= Decimal::ZERO {
        return Err(AppError::validation("sum must be positive"));
    }
    if !luhn::valid(request.order) {
        return Err(AppError::invalid_order_number());
    }

    db::withdrawals::insert(&state.pool, claims.user_id, request.order, request.sum).await?;
    tracing::info!(
        user_id = claims.user_id,
        order = request.order,
        "points withdrawn"
    );
    Ok(())
}

pub async fn withdrawals(state: &AppState, claims: &Claims) -> Result<Vec<Withdrawal>, AppError> {
    db::withdrawals::list_for_user(&state.pool, claims.user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::state::AppState;
    use rust_decimal_macros::dec;
    use sqlx::postgres::PgPoolOptions;

    fn test_state() -> AppState {
        AppState {
            pool: PgPoolOptions::new()
                .connect_lazy("postgres://localhost:1/unreachable")
                .unwrap(),
            jwt_secret: "secret".into(),
            jwt_expires: 24,
        }
    }

    fn claims() -> Claims {
        Claims {
            user_id: 1,
            login: "alice".into(),
        }
    }

    #[tokio::test]
    async fn non_positive_sums_are_rejected_before_the_store() {
        let state = test_state();
        for sum in [dec!(0), dec!(-1)] {
            let request = WithdrawRequest {
                order: 2377225624,
                sum,
            };
            let err = withdraw(&state, &claims(), &request).await.unwrap_err();
            assert_eq!(err.code, ErrorCode::Validation);
        }
    }

    #[tokio::test]
    async fn luhn_failures_are_rejected_before_the_store() {
        let state = test_state();
        let request = WithdrawRequest {
            order: 1234,
            sum: dec!(10),
        };
        let err = withdraw(&state, &claims(), &request).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidOrderNumber);
    }
}
