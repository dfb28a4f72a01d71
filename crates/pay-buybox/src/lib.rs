//! # pay-buybox
//!
//! Buybox express-checkout adapter for buybox-checkout-rs.
//!
//! This crate provides:
//!
//! 1. **BuyboxClient** - the name/value-pair gateway API
//!    - One method per gateway operation
//!    - Pluggable `AuthenticationStrategy`
//!    - Buyer redirect URLs for sandbox and production
//!
//! 2. **ExpressCheckoutPlugin** - `pay_core::PaymentPlugin` implementation
//!    - approve / approve-and-deposit via the redirect flow
//!    - deposit, credit and reverse approval of an approved payment
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pay_buybox::BuyboxConfig;
//! use pay_core::{PaymentPlugin, PluginOutcome};
//!
//! let plugin = BuyboxConfig::from_env()?.build_plugin()?;
//!
//! match plugin.approve(&mut transaction).await {
//!     PluginOutcome::ActionRequired { url } => { /* redirect the buyer to url */ }
//!     PluginOutcome::Completed => { /* authorized */ }
//!     PluginOutcome::Pending { reason } => { /* wait */ }
//!     PluginOutcome::Failed { error } => { /* report */ }
//! }
//! ```

pub mod amount;
pub mod auth;
pub mod client;
pub mod config;
pub mod environment;
pub mod plugin;
pub mod response;
pub mod transport;

// Re-exports
pub use amount::{format_amount, parse_amount};
pub use auth::{AuthenticationStrategy, TokenAuthenticationStrategy};
pub use client::{BuyboxClient, CompleteType, PaymentAction};
pub use config::BuyboxConfig;
pub use environment::Environment;
pub use plugin::{ExpressCheckoutPlugin, DEFAULT_DESCRIPTION, PAYMENT_SYSTEM_NAME};
pub use response::{Ack, GatewayError, Response};
pub use transport::{ApiRequest, Fields, RawResponse, TransportOptions, MULTIPART_FORM_DATA};
