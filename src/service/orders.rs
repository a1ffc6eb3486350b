//! Order admission and listing

use crate::db;
use crate::error::AppError;
use crate::luhn;
use crate::models::{Claims, Order};
use crate::state::AppState;

/// Admission result for a well-formed, owned-by-caller order number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// First upload; reconciliation will pick it up
    Accepted,
    /// Same user uploaded this number before; nothing changed
    AlreadyUploaded,
}

pub async fn admit(
    state: &AppState,
    claims: &Claims,
    number_text: &str,
) -> Result<Admission, AppError> {
    let number = parse_number(number_text)?;

    let admission = db::orders::upsert(&state.pool, claims.user_id, number).await?;

    if admission.was_inserted {
        tracing::info!(order = number, user_id = claims.user_id, "order admitted");
        return Ok(Admission::Accepted);
    }
    if admission.owner_id != claims.user_id {
        return Err(AppError::order_conflict());
    }

    tracing::debug!(
        order = number,
        status = admission.status.as_db(),
        "order already uploaded by its owner"
    );
    Ok(Admission::AlreadyUploaded)
}

pub async fn list(state: &AppState, claims: &Claims) -> Result<Vec<Order>, AppError> {
    db::orders::list_for_user(&state.pool, claims.user_id).await
}

/// Parse and checksum an order number from a request body
fn parse_number(text: &str) -> Result<i64, AppError> {
    let number = text
        .trim()
        .parse::<i64>()
        .map_err(|_| AppError::validation("order number must be a decimal integer"))?;

    if !luhn::valid(number) {
        return Err(AppError::invalid_order_number());
    }
    Ok(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn well_formed_numbers_parse() {
        assert_eq!(parse_number("79927398713").unwrap(), 79927398713);
        assert_eq!(parse_number("  79927398713\n").unwrap(), 79927398713);
    }

    #[test]
    fn non_numeric_bodies_are_validation_errors() {
        assert_eq!(
            parse_number("not-a-number").unwrap_err().code,
            ErrorCode::Validation
        );
        assert_eq!(parse_number("").unwrap_err().code, ErrorCode::Validation);
        assert_eq!(
            parse_number("12.5").unwrap_err().code,
            ErrorCode::Validation
        );
    }

    #[test]
    fn luhn_failures_are_unprocessable() {
        assert_eq!(
            parse_number("1234").unwrap_err().code,
            ErrorCode::InvalidOrderNumber
        );
        assert_eq!(
            parse_number("-79927398713").unwrap_err().code,
            ErrorCode::InvalidOrderNumber
        );
    }
}
