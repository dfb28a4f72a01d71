//! # Request Handlers
//!
//! Axum request handlers for the payment API.
//! Every plugin operation runs while holding the payment's lock.

use crate::state::AppState;
use crate::store::{Payment, SharedPayment};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use pay_buybox::PAYMENT_SYSTEM_NAME;
use pay_core::{
    BoxedPaymentPlugin, Currency, ExtendedData, ExtendedKey, FinancialTransaction, PaymentError,
    PaymentPlugin, PluginOutcome, TransactionType,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info, instrument};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Create payment request
#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    /// Payment system (defaults to "buybox_express_checkout")
    #[serde(default = "default_payment_system")]
    pub payment_system: String,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Currency,
    /// Per-payment overrides of the plugin's callback URLs
    #[serde(default)]
    pub return_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
    #[serde(default)]
    pub notify_url: Option<String>,
    #[serde(default)]
    pub useraction: Option<String>,
    /// Extra fields sent with the checkout request
    #[serde(default)]
    pub checkout_params: BTreeMap<String, String>,
    /// Authorize and capture in one step
    #[serde(default)]
    pub sale: bool,
}

fn default_payment_system() -> String {
    PAYMENT_SYSTEM_NAME.to_string()
}

/// Body of deposit and credit requests
#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: Decimal,
}

/// Query of the buyer's return from the gateway
#[derive(Debug, Deserialize)]
pub struct ReturnQuery {
    pub token: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn payment_error_to_response(err: PaymentError) -> ApiError {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

fn not_found(what: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(format!("{} not found: {}", what, id), 404)),
    )
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(message, 400)),
    )
}

/// Map a plugin outcome onto an HTTP response
fn outcome_response(
    outcome: PluginOutcome,
    payment_id: &str,
    transaction: &FinancialTransaction,
) -> Result<Response, ApiError> {
    match outcome {
        PluginOutcome::Completed => Ok((
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "completed",
                "payment_id": payment_id,
                "transaction": transaction,
            })),
        )
            .into_response()),
        PluginOutcome::ActionRequired { url } => Ok((
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "action_required",
                "payment_id": payment_id,
                "redirect_url": url,
            })),
        )
            .into_response()),
        PluginOutcome::Pending { reason } => Ok((
            StatusCode::ACCEPTED,
            Json(serde_json::json!({
                "status": "pending",
                "payment_id": payment_id,
                "reason": reason,
                "transaction": transaction,
            })),
        )
            .into_response()),
        PluginOutcome::Failed { error } => {
            error!("Payment {} failed: {}", payment_id, error);
            let (status, Json(body)) = payment_error_to_response(error);
            let body = match &transaction.reason_code {
                Some(reason) => body.with_details(format!("reason_code={}", reason)),
                None => body,
            };
            Err((status, Json(body)))
        }
    }
}

fn plugin_for<'a>(
    state: &'a AppState,
    transaction: &FinancialTransaction,
) -> Result<&'a BoxedPaymentPlugin, ApiError> {
    state.plugin(&transaction.payment_system).ok_or_else(|| {
        payment_error_to_response(PaymentError::Configuration(format!(
            "No plugin for payment system: {}",
            transaction.payment_system
        )))
    })
}

async fn find_payment(state: &AppState, id: &str) -> Result<SharedPayment, ApiError> {
    state
        .payments
        .get(id)
        .await
        .ok_or_else(|| not_found("Payment", id))
}

fn positive(amount: Decimal) -> Result<Decimal, ApiError> {
    if amount <= Decimal::ZERO {
        return Err(bad_request("Amount must be positive"));
    }
    Ok(amount)
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "buybox-checkout",
        "version": env!("CARGO_PKG_VERSION"),
        "plugins": state.plugins.plugin_names(),
    }))
}

/// Create a payment
#[instrument(
    skip(state, request),
    fields(payment_system = %request.payment_system, amount = %request.amount)
)]
pub async fn create_payment(
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let amount = positive(request.amount)?;

    if state.plugin(&request.payment_system).is_none() {
        return Err(bad_request(format!(
            "Unknown payment system: {}",
            request.payment_system
        )));
    }

    let mut data = ExtendedData::new();
    for (key, value) in [
        (ExtendedKey::ReturnUrl, request.return_url),
        (ExtendedKey::CancelUrl, request.cancel_url),
        (ExtendedKey::NotifyUrl, request.notify_url),
        (ExtendedKey::UserAction, request.useraction),
    ] {
        if let Some(value) = value {
            data.set(key, value);
        }
    }
    for (key, value) in request.checkout_params {
        data.set_checkout_param(key, value);
    }

    let transaction_type = if request.sale {
        TransactionType::ApproveAndDeposit
    } else {
        TransactionType::Approve
    };

    let approval = FinancialTransaction::new(
        transaction_type,
        request.payment_system,
        amount,
        request.currency,
    )
    .with_extended_data(data);
    let payment = Payment::new(approval);

    info!(
        "Created payment {}: {} {} ({})",
        payment.id,
        amount,
        request.currency,
        transaction_type.as_str()
    );

    let body = payment.clone();
    state.payments.insert(payment).await;

    Ok((StatusCode::CREATED, Json(body)))
}

/// Get a payment
pub async fn get_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let payment = find_payment(&state, &payment_id).await?;
    let payment = payment.lock().await.clone();
    Ok(Json(payment))
}

/// Run (or resume) the approval of a payment
async fn run_approval(state: &AppState, payment: &mut Payment) -> Result<Response, ApiError> {
    let plugin = plugin_for(state, &payment.approval)?;

    let outcome = match payment.approval.transaction_type {
        TransactionType::ApproveAndDeposit => {
            plugin.approve_and_deposit(&mut payment.approval).await
        }
        _ => plugin.approve(&mut payment.approval).await,
    };

    outcome_response(outcome, &payment.id, &payment.approval)
}

/// Start or resume approval
#[instrument(skip(state))]
pub async fn approve_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Response, ApiError> {
    let payment = find_payment(&state, &payment_id).await?;
    let mut payment = payment.lock().await;
    run_approval(&state, &mut payment).await
}

/// Run a deposit, credit or reverse approval against the payment's approval
async fn run_follow_up(
    state: &AppState,
    payment_id: &str,
    transaction_type: TransactionType,
    amount: Option<Decimal>,
) -> Result<Response, ApiError> {
    let payment = find_payment(state, payment_id).await?;
    let mut payment = payment.lock().await;

    let amount = amount.unwrap_or(payment.approval.requested_amount);
    let mut transaction = payment.approval.follow_up(transaction_type, amount);
    let plugin = plugin_for(state, &transaction)?;

    let outcome = match transaction_type {
        TransactionType::Deposit => plugin.deposit(&mut transaction).await,
        TransactionType::Credit => plugin.credit(&mut transaction).await,
        TransactionType::ReverseApproval => plugin.reverse_approval(&mut transaction).await,
        other => {
            return Err(bad_request(format!(
                "Not a follow-up operation: {}",
                other.as_str()
            )))
        }
    };

    let response = outcome_response(outcome, &payment.id, &transaction);
    payment.follow_ups.push(transaction);
    response
}

/// Capture an amount of the approved payment
#[instrument(skip(state, request))]
pub async fn deposit_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    Json(request): Json<AmountRequest>,
) -> Result<Response, ApiError> {
    let amount = positive(request.amount)?;
    run_follow_up(&state, &payment_id, TransactionType::Deposit, Some(amount)).await
}

/// Refund an amount of the payment
#[instrument(skip(state, request))]
pub async fn credit_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    Json(request): Json<AmountRequest>,
) -> Result<Response, ApiError> {
    let amount = positive(request.amount)?;
    run_follow_up(&state, &payment_id, TransactionType::Credit, Some(amount)).await
}

/// Void the payment's authorization
#[instrument(skip(state))]
pub async fn reverse_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Response, ApiError> {
    run_follow_up(&state, &payment_id, TransactionType::ReverseApproval, None).await
}

/// Buyer returns from the gateway: resume the approval holding the token
#[instrument(skip(state, query), fields(token = %query.token))]
pub async fn checkout_return(
    State(state): State<AppState>,
    Query(query): Query<ReturnQuery>,
) -> Result<Response, ApiError> {
    let payment = state
        .payments
        .find_by_token(&query.token)
        .await
        .ok_or_else(|| not_found("Checkout token", &query.token))?;

    let mut payment = payment.lock().await;
    info!("Buyer returned for payment {}", payment.id);
    run_approval(&state, &mut payment).await
}

/// Checkout cancel page
pub async fn checkout_cancel() -> impl IntoResponse {
    Html(
        r#"
<!DOCTYPE html>
<html>
<head><title>Payment Cancelled</title></head>
<body style="font-family: system-ui; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0;">
    <div style="padding: 60px; text-align: center;">
        <h1>Payment Cancelled</h1>
        <p style="color: #666;">No charges were made.</p>
    </div>
</body>
</html>
"#,
    )
}
