//! # pay-api
//!
//! HTTP API layer for buybox-checkout-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoints driving payment plugins
//! - Buyer return/cancel callbacks of the express checkout
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/v1/payments` | Create payment |
//! | GET | `/api/v1/payments/{id}` | Get payment |
//! | POST | `/api/v1/payments/{id}/approve` | Approve (or approve and deposit) |
//! | POST | `/api/v1/payments/{id}/deposit` | Capture |
//! | POST | `/api/v1/payments/{id}/credit` | Refund |
//! | POST | `/api/v1/payments/{id}/reverse` | Void authorization |
//! | GET | `/checkout/return` | Buyer returns with `token` |
//! | GET | `/checkout/cancel` | Buyer cancelled |

pub mod handlers;
pub mod routes;
pub mod state;
pub mod store;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
pub use store::{Payment, PaymentStore};
