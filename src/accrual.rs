//! Client for the external accrual system
//!
//! One GET per order and no internal retry; the reconciliation worker owns
//! backoff policy. The trait seam lets the worker pool run against a fake.

use async_trait::async_trait;
use http::HeaderMap;
use http::header::RETRY_AFTER;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::serde_helpers;

/// Order state as reported by the accrual system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccrualStatus {
    Registered,
    Processing,
    Processed,
    Invalid,
}

impl AccrualStatus {
    pub fn from_response(s: &str) -> Option<Self> {
        match s {
            "REGISTERED" => Some(AccrualStatus::Registered),
            "PROCESSING" => Some(AccrualStatus::Processing),
            "PROCESSED" => Some(AccrualStatus::Processed),
            "INVALID" => Some(AccrualStatus::Invalid),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AccrualStatus::Processed | AccrualStatus::Invalid)
    }
}

/// 200-response body from `GET /api/orders/{number}`
#[derive(Debug, Clone, Deserialize)]
pub struct AccrualOrder {
    #[serde(with = "serde_helpers::number_string")]
    pub order: i64,
    /// Raw status string; unknown values are routed (and logged) by the worker
    pub status: String,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub accrual: Option<Decimal>,
}

/// Uniform surface over the upstream's four answer shapes
#[derive(Debug, Clone)]
pub enum AccrualReply {
    /// 200 with a decoded body
    Order(AccrualOrder),
    /// 204: upstream has not seen this order yet
    NotRegistered,
    /// 429; `None` when the Retry-After header was missing or unparsable
    RateLimited { retry_after_secs: Option<u64> },
    /// Any other status, reported verbatim
    Unexpected(u16),
}

#[async_trait]
pub trait AccrualApi: Send + Sync {
    async fn get_order(&self, number: i64) -> Result<AccrualReply, reqwest::Error>;
}

pub struct AccrualClient {
    base_url: String,
    client: reqwest::Client,
}

/// Per-call deadline for upstream lookups
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(3);

impl AccrualClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }
}

#[async_trait]
impl AccrualApi for AccrualClient {
    async fn get_order(&self, number: i64) -> Result<AccrualReply, reqwest::Error> {
        let url = format!(
            "{}/api/orders/{number}",
            self.base_url.trim_end_matches('/')
        );
        let response = self.client.get(&url).send().await?;

        match response.status().as_u16() {
            200 => Ok(AccrualReply::Order(response.json().await?)),
            204 => Ok(AccrualReply::NotRegistered),
            429 => Ok(AccrualReply::RateLimited {
                retry_after_secs: retry_after_secs(response.headers()),
            }),
            code => Ok(AccrualReply::Unexpected(code)),
        }
    }
}

fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use rust_decimal_macros::dec;

    #[test]
    fn decodes_processed_body() {
        let body: AccrualOrder =
            serde_json::from_str(r#"{"order":"79927398713","status":"PROCESSED","accrual":100.5}"#)
                .unwrap();
        assert_eq!(body.order, 79927398713);
        assert_eq!(
            AccrualStatus::from_response(&body.status),
            Some(AccrualStatus::Processed)
        );
        assert_eq!(body.accrual, Some(dec!(100.5)));
    }

    #[test]
    fn accrual_field_is_optional() {
        let body: AccrualOrder =
            serde_json::from_str(r#"{"order":"79927398713","status":"REGISTERED"}"#).unwrap();
        assert_eq!(body.accrual, None);
    }

    #[test]
    fn unknown_status_parses_to_none() {
        assert_eq!(AccrualStatus::from_response("BANANA"), None);
        assert_eq!(AccrualStatus::from_response("processed"), None);
    }

    #[test]
    fn terminal_statuses() {
        assert!(AccrualStatus::Processed.is_terminal());
        assert!(AccrualStatus::Invalid.is_terminal());
        assert!(!AccrualStatus::Registered.is_terminal());
        assert!(!AccrualStatus::Processing.is_terminal());
    }

    #[test]
    fn retry_after_header_parses_as_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("2"));
        assert_eq!(retry_after_secs(&headers), Some(2));
    }

    #[test]
    fn bad_or_missing_retry_after_yields_none() {
        assert_eq!(retry_after_secs(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));
        assert_eq!(retry_after_secs(&headers), None);
    }
}
