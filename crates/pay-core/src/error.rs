//! # Payment Error Types
//!
//! Typed error handling for payment plugins and gateway clients.
//! Gateway calls return `Result<T, PaymentError>`; plugin operations fold
//! these into [`PluginOutcome::Failed`](crate::PluginOutcome::Failed).

use thiserror::Error;

/// Core error type for all payment operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PaymentError {
    /// Configuration errors (missing credentials, missing return/cancel URL)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data (missing approval, bad amount, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Non-200 reply or transport failure talking to the gateway
    #[error("Communication error: {message}")]
    Communication {
        message: String,
        status: Option<u16>,
    },

    /// The gateway refused the operation or returned a terminal status
    #[error("Financial error: {message}")]
    Financial {
        message: String,
        response_code: Option<String>,
        reason_code: Option<String>,
    },

    /// The gateway replied successfully but a required field was missing or malformed
    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),

    /// The plugin does not implement this operation
    #[error("Operation not supported: {operation}")]
    UnsupportedOperation { operation: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PaymentError {
    /// Build a communication error
    pub fn communication(message: impl Into<String>, status: Option<u16>) -> Self {
        PaymentError::Communication {
            message: message.into(),
            status,
        }
    }

    /// Build a financial error carrying the codes recorded on the transaction
    pub fn financial(
        message: impl Into<String>,
        response_code: Option<String>,
        reason_code: Option<String>,
    ) -> Self {
        PaymentError::Financial {
            message: message.into(),
            response_code,
            reason_code,
        }
    }

    /// Returns true if the caller may retry this operation later.
    ///
    /// Nothing in this workspace retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::Communication { .. })
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::Configuration(_) => 500,
            PaymentError::InvalidRequest(_) => 400,
            PaymentError::Communication { .. } => 503,
            PaymentError::Financial { .. } => 402,
            PaymentError::InvalidResponse(_) => 502,
            PaymentError::UnsupportedOperation { .. } => 501,
            PaymentError::Serialization(_) => 500,
            PaymentError::Internal(_) => 500,
        }
    }
}

/// Result type alias for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;
