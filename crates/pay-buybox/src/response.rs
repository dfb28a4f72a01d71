//! # NVP Response
//!
//! Parsed name/value reply of the Buybox API.

use crate::amount::parse_amount;
use pay_core::{PaymentError, PaymentResult};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;

/// Top-level acknowledgement (`ACK`) of a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Success,
    SuccessWithWarning,
    PartialSuccess,
    Warning,
    Failure,
    FailureWithWarning,
}

impl Ack {
    /// Parse the fixed `ACK` strings; anything else is unknown
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Success" => Some(Ack::Success),
            "SuccessWithWarning" => Some(Ack::SuccessWithWarning),
            "PartialSuccess" => Some(Ack::PartialSuccess),
            "Warning" => Some(Ack::Warning),
            "Failure" => Some(Ack::Failure),
            "FailureWithWarning" => Some(Ack::FailureWithWarning),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Ack::Success => "Success",
            Ack::SuccessWithWarning => "SuccessWithWarning",
            Ack::PartialSuccess => "PartialSuccess",
            Ack::Warning => "Warning",
            Ack::Failure => "Failure",
            Ack::FailureWithWarning => "FailureWithWarning",
        }
    }
}

/// One entry of the indexed `L_ERRORCODEn` list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    pub code: String,
    pub short_message: String,
    pub long_message: String,
}

/// Parsed reply body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    body: BTreeMap<String, String>,
}

impl Response {
    pub fn new(body: BTreeMap<String, String>) -> Self {
        Self { body }
    }

    /// Parse a URL-encoded reply body. Repeated keys keep the last value.
    pub fn from_body(body: &str) -> PaymentResult<Self> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(body).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse Buybox response: {}", e))
        })?;

        Ok(Self {
            body: pairs.into_iter().collect(),
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.body.get(key).map(|v| v.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.body.contains_key(key)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.body
    }

    pub fn ack(&self) -> Option<Ack> {
        self.get("ACK").and_then(Ack::parse)
    }

    pub fn is_success(&self) -> bool {
        matches!(self.ack(), Some(Ack::Success | Ack::SuccessWithWarning))
    }

    pub fn is_partial_success(&self) -> bool {
        self.ack() == Some(Ack::PartialSuccess)
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self.ack(),
            Some(Ack::Failure | Ack::FailureWithWarning | Ack::Warning)
        )
    }

    /// Errors in index order, stopping at the first missing index
    pub fn errors(&self) -> Vec<GatewayError> {
        (0..)
            .map_while(|i| {
                let code = self.get(&format!("L_ERRORCODE{}", i))?;
                Some(GatewayError {
                    code: code.to_string(),
                    short_message: self
                        .get(&format!("L_SHORTMESSAGE{}", i))
                        .unwrap_or_default()
                        .to_string(),
                    long_message: self
                        .get(&format!("L_LONGMESSAGE{}", i))
                        .unwrap_or_default()
                        .to_string(),
                })
            })
            .collect()
    }

    pub fn token(&self) -> Option<&str> {
        self.get("TOKEN")
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.get("TRANSACTIONID")
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.get("CORRELATIONID")
    }

    /// Parse a monetary field, `None` when absent
    pub fn decimal(&self, key: &str) -> PaymentResult<Option<Decimal>> {
        self.get(key).map(parse_amount).transpose()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_error() {
            writeln!(
                f,
                "Debug-Token: {}",
                self.correlation_id().unwrap_or_default()
            )?;
            for error in self.errors() {
                writeln!(
                    f,
                    "{}: {} ({})",
                    error.code, error.short_message, error.long_message
                )?;
            }
            Ok(())
        } else {
            write!(f, "{:#?}", self.body)
        }
    }
}
