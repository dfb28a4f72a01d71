//! # pay-core
//!
//! Generic transaction-processing contract for buybox-checkout payment plugins.
//!
//! This crate provides:
//! - `PaymentPlugin` trait implemented by gateway plugins
//! - `PluginOutcome` returned by every plugin operation
//! - `FinancialTransaction` and `ExtendedData`, the caller-owned state
//! - `PluginRegistry` to route transactions to plugins
//! - `PaymentError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use pay_core::{Currency, FinancialTransaction, PluginOutcome, TransactionType};
//!
//! let mut tx = FinancialTransaction::new(
//!     TransactionType::Approve,
//!     "buybox_express_checkout",
//!     dec!(42.00),
//!     Currency::EUR,
//! );
//!
//! let plugin = registry.find(&tx.payment_system).unwrap();
//! match plugin.approve(&mut tx).await {
//!     PluginOutcome::ActionRequired { url } => { /* redirect the buyer */ }
//!     PluginOutcome::Completed => { /* fulfil */ }
//!     PluginOutcome::Pending { reason } => { /* wait for notification */ }
//!     PluginOutcome::Failed { error } => { /* report */ }
//! }
//! ```

pub mod currency;
pub mod error;
pub mod extended_data;
pub mod plugin;
pub mod transaction;

// Re-exports for convenience
pub use currency::Currency;
pub use error::{PaymentError, PaymentResult};
pub use extended_data::{ExtendedData, ExtendedKey};
pub use plugin::{BoxedPaymentPlugin, PaymentPlugin, PluginOutcome, PluginRegistry};
pub use transaction::{
    ApprovalRecord, FinancialTransaction, TransactionState, TransactionType,
    REASON_CODE_SUCCESS, RESPONSE_CODE_FAILED, RESPONSE_CODE_SUCCESS,
};
