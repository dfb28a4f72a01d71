//! # Payment Plugin Trait
//!
//! Contract between the application and gateway-specific plugins.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PaymentPlugin (trait)                    │
//! │  ├── approve() / approve_and_deposit()                      │
//! │  ├── deposit() / credit() / reverse_approval()              │
//! │  └── processes()                                            │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                    ┌───────┴────────┐
//!                    │ ExpressCheckout│
//!                    │     Plugin     │
//!                    └────────────────┘
//! ```
//!
//! Every operation returns a [`PluginOutcome`]. Redirects and pending
//! settlement are ordinary variants the caller branches on, not errors.

use crate::error::{PaymentError, PaymentResult};
use crate::transaction::FinancialTransaction;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Result of a plugin operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PluginOutcome {
    /// The transaction reached its terminal success state
    Completed,
    /// The buyer must visit `url` before the operation can continue
    ActionRequired { url: String },
    /// Accepted by the gateway, settlement happens asynchronously
    Pending { reason: String },
    /// The operation failed
    Failed {
        #[serde(serialize_with = "serialize_error")]
        error: PaymentError,
    },
}

fn serialize_error<S: serde::Serializer>(err: &PaymentError, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&err.to_string())
}

impl PluginOutcome {
    pub fn failed(error: PaymentError) -> Self {
        PluginOutcome::Failed { error }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, PluginOutcome::Completed)
    }

    pub fn redirect_url(&self) -> Option<&str> {
        match self {
            PluginOutcome::ActionRequired { url } => Some(url),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&PaymentError> {
        match self {
            PluginOutcome::Failed { error } => Some(error),
            _ => None,
        }
    }
}

impl From<PaymentResult<PluginOutcome>> for PluginOutcome {
    fn from(result: PaymentResult<PluginOutcome>) -> Self {
        result.unwrap_or_else(PluginOutcome::failed)
    }
}

/// Core trait for payment plugin implementations.
///
/// Operations mutate the caller-owned transaction in place. Concurrent
/// calls on the same transaction must be serialized by the caller.
#[async_trait]
pub trait PaymentPlugin: Send + Sync {
    /// Authorize the requested amount.
    async fn approve(&self, transaction: &mut FinancialTransaction) -> PluginOutcome;

    /// Authorize and capture in one step.
    async fn approve_and_deposit(&self, transaction: &mut FinancialTransaction) -> PluginOutcome;

    /// Capture (part of) a prior authorization.
    async fn deposit(&self, transaction: &mut FinancialTransaction) -> PluginOutcome {
        let _ = transaction;
        PluginOutcome::failed(PaymentError::UnsupportedOperation {
            operation: "deposit".to_string(),
        })
    }

    /// Refund (part of) a captured payment.
    async fn credit(&self, transaction: &mut FinancialTransaction) -> PluginOutcome {
        let _ = transaction;
        PluginOutcome::failed(PaymentError::UnsupportedOperation {
            operation: "credit".to_string(),
        })
    }

    /// Void an authorization.
    async fn reverse_approval(&self, transaction: &mut FinancialTransaction) -> PluginOutcome {
        let _ = transaction;
        PluginOutcome::failed(PaymentError::UnsupportedOperation {
            operation: "reverse_approval".to_string(),
        })
    }

    /// Whether this plugin handles the given payment system.
    fn processes(&self, payment_system: &str) -> bool;

    /// Whether refunds without a prior transaction are supported.
    fn is_independent_credit_supported(&self) -> bool {
        false
    }

    /// Plugin name (for logging and routing).
    fn plugin_name(&self) -> &'static str;
}

/// Type alias for a boxed payment plugin (dynamic dispatch)
pub type BoxedPaymentPlugin = Arc<dyn PaymentPlugin>;

/// Registry of plugins, looked up by payment system name
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: Vec<BoxedPaymentPlugin>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    /// Register a payment plugin
    pub fn register(&mut self, plugin: BoxedPaymentPlugin) {
        self.plugins.push(plugin);
    }

    /// Register with builder pattern
    pub fn with_plugin(mut self, plugin: BoxedPaymentPlugin) -> Self {
        self.register(plugin);
        self
    }

    /// First registered plugin that processes `payment_system`
    pub fn find(&self, payment_system: &str) -> Option<&BoxedPaymentPlugin> {
        self.plugins.iter().find(|p| p.processes(payment_system))
    }

    /// List all registered plugin names
    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.plugin_name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
