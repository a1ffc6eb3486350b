//! Domain types and their JSON shapes
//!
//! Order numbers are serialized as strings to survive JSON consumers that
//! truncate large integers; money fields serialize as plain numbers via
//! `rust_decimal`'s float adapter while storage keeps full precision.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Authenticated principal carried with each protected request
#[derive(Debug, Clone)]
pub struct Claims {
    pub user_id: i32,
    pub login: String,
}

/// Registration / login payload
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

#[derive(Debug, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub login: String,
    pub password_hash: String,
}

/// Order lifecycle. `Processed` and `Invalid` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    New,
    Processing,
    Invalid,
    Processed,
}

impl OrderStatus {
    pub fn as_db(self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Invalid => "INVALID",
            OrderStatus::Processed => "PROCESSED",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "NEW" => Some(OrderStatus::New),
            "PROCESSING" => Some(OrderStatus::Processing),
            "INVALID" => Some(OrderStatus::Invalid),
            "PROCESSED" => Some(OrderStatus::Processed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Invalid | OrderStatus::Processed)
    }
}

impl Serialize for OrderStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_db())
    }
}

/// A user's uploaded order as returned by `GET /api/user/orders`
#[derive(Debug, Serialize)]
pub struct Order {
    #[serde(with = "serde_helpers::number_string")]
    pub number: i64,
    pub status: OrderStatus,
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub accrual: Option<Decimal>,
    pub uploaded_at: DateTime<Utc>,
}

/// A completed withdrawal as returned by `GET /api/user/withdrawals`
#[derive(Debug, Serialize)]
pub struct Withdrawal {
    #[serde(with = "serde_helpers::number_string")]
    pub order: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub sum: Decimal,
    pub processed_at: DateTime<Utc>,
}

/// Withdrawal request body for `POST /api/user/balance/withdraw`
#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    #[serde(with = "serde_helpers::number_string")]
    pub order: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub sum: Decimal,
}

/// Balance response, rounded to two decimals at construction
#[derive(Debug, Serialize)]
pub struct Balance {
    #[serde(with = "rust_decimal::serde::float")]
    pub current: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub withdrawn: Decimal,
}

impl Balance {
    pub fn new(accrued: Decimal, withdrawn: Decimal) -> Self {
        Self {
            current: round_money(accrued - withdrawn),
            withdrawn: round_money(withdrawn),
        }
    }
}

/// Round a money value to two decimals, half away from zero
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub mod serde_helpers {
    /// Serialize an `i64` as a JSON string and read it back from one
    pub mod number_string {
        use serde::{Deserialize, Deserializer, Serializer, de::Error};

        pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&value.to_string())
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
            let raw = String::deserialize(deserializer)?;
            raw.parse().map_err(D::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_serializes_number_as_string() {
        let order = Order {
            number: 79927398713,
            status: OrderStatus::Processed,
            accrual: Some(dec!(100.5)),
            uploaded_at: "2026-03-01T10:00:00Z".parse().unwrap(),
        };
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["number"], "79927398713");
        assert_eq!(json["status"], "PROCESSED");
        assert_eq!(json["accrual"], 100.5);
    }

    #[test]
    fn order_without_accrual_omits_the_field() {
        let order = Order {
            number: 12345678903,
            status: OrderStatus::New,
            accrual: None,
            uploaded_at: Utc::now(),
        };
        let json = serde_json::to_value(&order).unwrap();
        assert!(json.get("accrual").is_none());
        assert_eq!(json["status"], "NEW");
    }

    #[test]
    fn withdraw_request_reads_order_from_string() {
        let req: WithdrawRequest =
            serde_json::from_str(r#"{"order":"2377225624","sum":40.5}"#).unwrap();
        assert_eq!(req.order, 2377225624);
        assert_eq!(req.sum, dec!(40.5));
    }

    #[test]
    fn withdraw_request_rejects_numeric_order() {
        let result = serde_json::from_str::<WithdrawRequest>(r#"{"order":2377225624,"sum":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn balance_rounds_half_away_from_zero() {
        let balance = Balance::new(dec!(100.505), dec!(0.005));
        assert_eq!(balance.current, dec!(100.50));
        assert_eq!(balance.withdrawn, dec!(0.01));
    }

    #[test]
    fn balance_subtracts_withdrawn() {
        let balance = Balance::new(dec!(100.5), dec!(40.5));
        assert_eq!(balance.current, dec!(60));
        assert_eq!(balance.withdrawn, dec!(40.5));
    }

    #[test]
    fn status_round_trips_through_db_text() {
        for status in [
            OrderStatus::New,
            OrderStatus::Processing,
            OrderStatus::Invalid,
            OrderStatus::Processed,
        ] {
            assert_eq!(OrderStatus::from_db(status.as_db()), Some(status));
        }
        assert_eq!(OrderStatus::from_db("UNKNOWN"), None);
    }

    #[test]
    fn terminal_statuses_are_absorbing() {
        assert!(OrderStatus::Processed.is_terminal());
        assert!(OrderStatus::Invalid.is_terminal());
        assert!(!OrderStatus::New.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
    }
}
