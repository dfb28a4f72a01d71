//! # Express Checkout Plugin
//!
//! Maps the generic transaction lifecycle onto the Buybox express-checkout
//! protocol:
//!
//! ```text
//! approve ──► SetExpressCheckout ──► buyer redirect (ActionRequired)
//!                                         │
//! approve (again) ◄───────────────────────┘
//!     └─► GetExpressCheckoutDetails ──► DoExpressCheckoutPayment
//!
//! deposit ──► DoCapture ──► GetTransactionDetails
//! credit  ──► RefundTransaction
//! reverse ──► DoVoid
//! ```
//!
//! Progress is kept in the transaction's extended data, so an approval that
//! returned `ActionRequired` is resumed by calling `approve` again once the
//! buyer comes back.

use crate::client::{BuyboxClient, CompleteType, PaymentAction};
use crate::response::Response;
use crate::transport::Fields;
use async_trait::async_trait;
use pay_core::{
    ExtendedData, ExtendedKey, FinancialTransaction, PaymentError, PaymentPlugin, PaymentResult,
    PluginOutcome, RESPONSE_CODE_FAILED,
};
use tracing::{info, instrument, warn};

/// Payment system name handled by [`ExpressCheckoutPlugin`]
pub const PAYMENT_SYSTEM_NAME: &str = "buybox_express_checkout";

/// Default `DESC` sent with the checkout commit
pub const DEFAULT_DESCRIPTION: &str = "Express checkout payment";

/// Buybox express-checkout plugin
#[derive(Debug, Clone)]
pub struct ExpressCheckoutPlugin {
    client: BuyboxClient,
    return_url: Option<String>,
    cancel_url: Option<String>,
    notify_url: Option<String>,
    user_action: Option<String>,
    description: String,
}

impl ExpressCheckoutPlugin {
    pub fn new(client: BuyboxClient) -> Self {
        Self {
            client,
            return_url: None,
            cancel_url: None,
            notify_url: None,
            user_action: None,
            description: DEFAULT_DESCRIPTION.to_string(),
        }
    }

    /// Builder: default return URL
    pub fn with_return_url(mut self, url: impl Into<String>) -> Self {
        self.return_url = Some(url.into());
        self
    }

    /// Builder: default cancel URL
    pub fn with_cancel_url(mut self, url: impl Into<String>) -> Self {
        self.cancel_url = Some(url.into());
        self
    }

    /// Builder: default notification URL
    pub fn with_notify_url(mut self, url: impl Into<String>) -> Self {
        self.notify_url = Some(url.into());
        self
    }

    /// Builder: default `useraction` appended to the redirect URL
    pub fn with_user_action(mut self, action: impl Into<String>) -> Self {
        self.user_action = Some(action.into());
        self
    }

    /// Builder: `DESC` sent with the checkout commit
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn client(&self) -> &BuyboxClient {
        &self.client
    }

    /// Per-transaction value first, then the plugin default. Empty defaults count as unset.
    fn resolve<'a>(
        data: &'a ExtendedData,
        key: ExtendedKey,
        default: &'a Option<String>,
    ) -> Option<&'a str> {
        data.get(key)
            .or_else(|| default.as_deref().filter(|v| !v.is_empty()))
    }

    fn return_url<'a>(&'a self, data: &'a ExtendedData) -> PaymentResult<&'a str> {
        Self::resolve(data, ExtendedKey::ReturnUrl, &self.return_url)
            .ok_or_else(|| PaymentError::Configuration("You must configure a return url.".into()))
    }

    fn cancel_url<'a>(&'a self, data: &'a ExtendedData) -> PaymentResult<&'a str> {
        Self::resolve(data, ExtendedKey::CancelUrl, &self.cancel_url)
            .ok_or_else(|| PaymentError::Configuration("You must configure a cancel url.".into()))
    }

    fn notify_url<'a>(&'a self, data: &'a ExtendedData) -> Option<&'a str> {
        Self::resolve(data, ExtendedKey::NotifyUrl, &self.notify_url)
    }

    fn user_action<'a>(&'a self, data: &'a ExtendedData) -> Option<&'a str> {
        Self::resolve(data, ExtendedKey::UserAction, &self.user_action).filter(|a| !a.is_empty())
    }

    /// Record the gateway's failure codes and turn the reply into an error
    fn ensure_success(
        response: &Response,
        transaction: &mut FinancialTransaction,
    ) -> PaymentResult<()> {
        if response.is_success() {
            return Ok(());
        }

        let response_code = response.get("ACK").map(str::to_string);
        let reason_code = response.get("L_ERRORCODE0").map(str::to_string);
        warn!(
            "Buybox call failed: transaction={}, ack={:?}, error={:?}",
            transaction.id, response_code, reason_code
        );
        transaction.mark_failed(response_code.clone(), reason_code.clone());

        Err(PaymentError::financial(
            format!("Buybox response was not successful: {}", response),
            response_code,
            reason_code,
        ))
    }

    /// Terminal non-completed payment status
    fn status_failure(
        status: Option<&str>,
        transaction: &mut FinancialTransaction,
    ) -> PaymentError {
        let status = status.unwrap_or_default().to_string();
        transaction.mark_failed(Some(RESPONSE_CODE_FAILED.to_string()), Some(status.clone()));
        PaymentError::financial(
            format!("PaymentStatus is not completed: {}", status),
            Some(RESPONSE_CODE_FAILED.to_string()),
            Some(status),
        )
    }

    /// Redirect to the login page, with `useraction` when one is resolved
    fn action_required(
        &self,
        token: &str,
        transaction: &mut FinancialTransaction,
    ) -> PluginOutcome {
        let params: Vec<(&str, &str)> = self
            .user_action(&transaction.extended_data)
            .map(|action| vec![("useraction", action)])
            .unwrap_or_default();
        let url = self
            .client
            .authenticate_express_checkout_token_url(token, &params);

        transaction.mark_pending();
        info!("Buyer must authorize transaction {}", transaction.id);
        PluginOutcome::ActionRequired { url }
    }

    /// Stored token, or a fresh one whose redirect outcome (inner `Err`) ends the call
    async fn obtain_token(
        &self,
        transaction: &mut FinancialTransaction,
        action: PaymentAction,
    ) -> PaymentResult<Result<String, PluginOutcome>> {
        if let Some(token) = transaction.extended_data.get(ExtendedKey::ExpressCheckoutToken) {
            return Ok(Ok(token.to_string()));
        }

        let data = &transaction.extended_data;
        let mut optional: Fields = data.checkout_params().clone();
        optional.insert("PAYMENTACTION".into(), action.as_str().to_string());
        optional.insert("CURRENCYCODE".into(), transaction.currency.to_string());

        let return_url = self.return_url(data)?.to_string();
        let cancel_url = self.cancel_url(data)?.to_string();

        let response = self
            .client
            .set_express_checkout(
                transaction.requested_amount,
                &return_url,
                &cancel_url,
                optional,
            )
            .await?;
        Self::ensure_success(&response, transaction)?;

        let token = response.token().ok_or_else(|| {
            PaymentError::InvalidResponse("SetExpressCheckout reply carried no TOKEN".into())
        })?;
        transaction
            .extended_data
            .set(ExtendedKey::ExpressCheckoutToken, token);

        Ok(Err(self.action_required(token, transaction)))
    }

    #[instrument(skip(self, transaction), fields(transaction_id = %transaction.id))]
    async fn checkout(
        &self,
        transaction: &mut FinancialTransaction,
        action: PaymentAction,
    ) -> PaymentResult<PluginOutcome> {
        let token = match self.obtain_token(transaction, action).await? {
            Ok(token) => token,
            Err(outcome) => return Ok(outcome),
        };

        let details = self.client.get_express_checkout_details(&token).await?;
        Self::ensure_success(&details, transaction)?;

        match details.get("CHECKOUTSTATUS") {
            Some("PaymentActionFailed") => {
                transaction.mark_failed(
                    Some(RESPONSE_CODE_FAILED.to_string()),
                    Some("PaymentActionFailed".to_string()),
                );
                return Err(PaymentError::financial(
                    "PaymentAction failed.",
                    Some(RESPONSE_CODE_FAILED.to_string()),
                    Some("PaymentActionFailed".to_string()),
                ));
            }
            Some("PaymentCompleted" | "PaymentActionNotInitiated" | "PaymentActionInProgress") => {}
            _ => return Ok(self.action_required(&token, transaction)),
        }

        let payer_id = details.get("PAYERID");
        if let Some(payer_id) = payer_id {
            transaction.extended_data.set(ExtendedKey::PayerId, payer_id);
        }

        let mut optional = Fields::new();
        optional.insert("CURRENCYCODE".into(), transaction.currency.to_string());
        if let Some(notify_url) = self.notify_url(&transaction.extended_data) {
            optional.insert("NOTIFYURL".into(), notify_url.to_string());
        }
        optional.insert("DESC".into(), self.description.clone());

        let response = self
            .client
            .do_express_checkout_payment(
                &token,
                transaction.requested_amount,
                action,
                payer_id,
                optional,
            )
            .await?;
        Self::ensure_success(&response, transaction)?;

        match response.get("PAYMENTSTATUS") {
            Some("Completed") => {
                let transaction_id = response.transaction_id().map(str::to_string);
                if let Some(id) = &transaction_id {
                    transaction
                        .extended_data
                        .set(ExtendedKey::AuthorizationId, id.as_str());
                }
                transaction.reference_number = transaction_id;
                transaction.processed_amount = match response.decimal("AMT") {
                    Ok(amount) => amount,
                    Err(e) => {
                        warn!(
                            "Completed checkout with unreadable AMT: transaction={}, {}",
                            transaction.id, e
                        );
                        None
                    }
                };
                transaction.mark_success();

                info!("Checkout completed for transaction {}", transaction.id);
                Ok(PluginOutcome::Completed)
            }
            Some("Pending") => {
                let transaction_id = response.transaction_id().map(str::to_string);
                if let Some(id) = &transaction_id {
                    transaction
                        .extended_data
                        .set(ExtendedKey::AuthorizationId, id.as_str());
                }
                transaction.reference_number = transaction_id;
                transaction.mark_pending();

                Ok(PluginOutcome::Pending {
                    reason: response.get("PENDINGREASON").unwrap_or_default().to_string(),
                })
            }
            status => Err(Self::status_failure(status, transaction)),
        }
    }

    #[instrument(skip(self, transaction), fields(transaction_id = %transaction.id))]
    async fn capture(
        &self,
        transaction: &mut FinancialTransaction,
    ) -> PaymentResult<PluginOutcome> {
        let approval = transaction.approval.clone().ok_or_else(|| {
            PaymentError::InvalidRequest("Deposit requires an approved payment".into())
        })?;
        let authorization_id = approval.reference_number;

        let complete_type = if approval.approved_amount == transaction.requested_amount {
            CompleteType::Complete
        } else {
            CompleteType::NotComplete
        };

        let mut optional = Fields::new();
        optional.insert("CURRENCYCODE".into(), transaction.currency.to_string());

        let response = self
            .client
            .do_capture(
                &authorization_id,
                transaction.requested_amount,
                complete_type,
                optional,
            )
            .await?;
        Self::ensure_success(&response, transaction)?;

        let details = self.client.get_transaction_details(&authorization_id).await?;
        Self::ensure_success(&details, transaction)?;

        match details.get("PAYMENTSTATUS") {
            Some("Completed") => {
                transaction.reference_number = Some(authorization_id);
                transaction.processed_amount = details.decimal("AMT")?;
                transaction.mark_success();
                Ok(PluginOutcome::Completed)
            }
            Some("Pending") => {
                transaction.mark_pending();
                Ok(PluginOutcome::Pending {
                    reason: details.get("PENDINGREASON").unwrap_or_default().to_string(),
                })
            }
            status => Err(Self::status_failure(status, transaction)),
        }
    }

    /// Authorization the follow-up operates on
    fn authorization_id(transaction: &FinancialTransaction) -> PaymentResult<String> {
        transaction
            .extended_data
            .get(ExtendedKey::AuthorizationId)
            .map(str::to_string)
            .or_else(|| {
                transaction
                    .approval
                    .as_ref()
                    .map(|a| a.reference_number.clone())
            })
            .ok_or_else(|| {
                PaymentError::InvalidRequest("No authorization id on the transaction".into())
            })
    }

    #[instrument(skip(self, transaction), fields(transaction_id = %transaction.id))]
    async fn refund(&self, transaction: &mut FinancialTransaction) -> PaymentResult<PluginOutcome> {
        let authorization_id = Self::authorization_id(transaction)?;

        let full_refund = transaction
            .approval
            .as_ref()
            .is_some_and(|a| a.processed_amount == transaction.requested_amount);

        let mut optional = Fields::new();
        if !full_refund {
            optional.insert("REFUNDTYPE".into(), "Partial".into());
            optional.insert(
                "AMT".into(),
                crate::amount::format_amount(transaction.requested_amount),
            );
            optional.insert("CURRENCYCODE".into(), transaction.currency.to_string());
        }

        let response = self
            .client
            .refund_transaction(&authorization_id, optional)
            .await?;
        Self::ensure_success(&response, transaction)?;

        transaction.reference_number = response.get("REFUNDTRANSACTIONID").map(str::to_string);
        transaction.processed_amount = response.decimal("NETREFUNDAMT")?;
        transaction.mark_success();

        Ok(PluginOutcome::Completed)
    }

    #[instrument(skip(self, transaction), fields(transaction_id = %transaction.id))]
    async fn void(&self, transaction: &mut FinancialTransaction) -> PaymentResult<PluginOutcome> {
        let authorization_id = Self::authorization_id(transaction)?;

        let response = self.client.do_void(&authorization_id, Fields::new()).await?;
        Self::ensure_success(&response, transaction)?;

        transaction.mark_success();
        Ok(PluginOutcome::Completed)
    }
}

#[async_trait]
impl PaymentPlugin for ExpressCheckoutPlugin {
    async fn approve(&self, transaction: &mut FinancialTransaction) -> PluginOutcome {
        self.checkout(transaction, PaymentAction::Authorization)
            .await
            .into()
    }

    async fn approve_and_deposit(&self, transaction: &mut FinancialTransaction) -> PluginOutcome {
        self.checkout(transaction, PaymentAction::Sale).await.into()
    }

    async fn deposit(&self, transaction: &mut FinancialTransaction) -> PluginOutcome {
        self.capture(transaction).await.into()
    }

    async fn credit(&self, transaction: &mut FinancialTransaction) -> PluginOutcome {
        self.refund(transaction).await.into()
    }

    async fn reverse_approval(&self, transaction: &mut FinancialTransaction) -> PluginOutcome {
        self.void(transaction).await.into()
    }

    fn processes(&self, payment_system: &str) -> bool {
        payment_system == PAYMENT_SYSTEM_NAME
    }

    fn is_independent_credit_supported(&self) -> bool {
        false
    }

    fn plugin_name(&self) -> &'static str {
        PAYMENT_SYSTEM_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenAuthenticationStrategy;
    use crate::environment::Environment;
    use pay_core::{Currency, TransactionState, TransactionType};
    use rust_decimal_macros::dec;

    fn plugin() -> ExpressCheckoutPlugin {
        let client = BuyboxClient::new(
            TokenAuthenticationStrategy::new("user", "pass", "sig"),
            Environment::Sandbox,
        )
        .unwrap();
        ExpressCheckoutPlugin::new(client)
    }

    fn transaction() -> FinancialTransaction {
        FinancialTransaction::new(
            TransactionType::Approve,
            PAYMENT_SYSTEM_NAME,
            dec!(10.00),
            Currency::EUR,
        )
    }

    #[test]
    fn test_processes_only_its_system() {
        let plugin = plugin();
        assert!(plugin.processes("buybox_express_checkout"));
        assert!(!plugin.processes("paypal_express_checkout"));
        assert!(!plugin.is_independent_credit_supported());
        assert_eq!(plugin.plugin_name(), PAYMENT_SYSTEM_NAME);
    }

    #[test]
    fn test_url_resolution_prefers_extended_data() {
        let plugin = plugin().with_return_url("https://shop.example/return");
        let data = ExtendedData::new().with(ExtendedKey::ReturnUrl, "https://tx.example/return");

        assert_eq!(plugin.return_url(&data).unwrap(), "https://tx.example/return");
        assert_eq!(
            plugin.return_url(&ExtendedData::new()).unwrap(),
            "https://shop.example/return"
        );
    }

    #[test]
    fn test_missing_cancel_url_is_configuration_error() {
        let plugin = plugin().with_cancel_url("");
        let err = plugin.cancel_url(&ExtendedData::new()).unwrap_err();
        assert!(matches!(err, PaymentError::Configuration(_)));
    }

    #[test]
    fn test_notify_url_optional() {
        let plugin = plugin();
        assert_eq!(plugin.notify_url(&ExtendedData::new()), None);

        let plugin = plugin.with_notify_url("https://shop.example/ipn");
        assert_eq!(
            plugin.notify_url(&ExtendedData::new()),
            Some("https://shop.example/ipn")
        );
    }

    #[test]
    fn test_action_required_appends_user_action() {
        let plugin = plugin().with_user_action("commit");
        let mut tx = transaction();

        let outcome = plugin.action_required("EC-1", &mut tx);

        assert_eq!(
            outcome.redirect_url(),
            Some("https://sandbox.buybox.net/secure/payment_login.php?token=EC-1&useraction=commit")
        );
        assert_eq!(tx.state, TransactionState::Pending);
    }

    #[test]
    fn test_empty_user_action_is_skipped() {
        let plugin = plugin().with_user_action("commit");
        let mut tx = transaction();
        tx.extended_data.set(ExtendedKey::UserAction, "");

        let outcome = plugin.action_required("EC-1", &mut tx);

        assert_eq!(
            outcome.redirect_url(),
            Some("https://sandbox.buybox.net/secure/payment_login.php?token=EC-1")
        );
    }

    #[test]
    fn test_ensure_success_records_codes() {
        let mut tx = transaction();
        let response =
            Response::from_body("ACK=Failure&L_ERRORCODE0=10413&CORRELATIONID=x").unwrap();

        let err = ExpressCheckoutPlugin::ensure_success(&response, &mut tx).unwrap_err();

        assert_eq!(tx.response_code.as_deref(), Some("Failure"));
        assert_eq!(tx.reason_code.as_deref(), Some("10413"));
        match err {
            PaymentError::Financial {
                message,
                response_code,
                reason_code,
            } => {
                assert!(message.starts_with("Buybox response was not successful: "));
                assert_eq!(response_code.as_deref(), Some("Failure"));
                assert_eq!(reason_code.as_deref(), Some("10413"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_deposit_without_approval_is_invalid() {
        let plugin = plugin();
        let mut tx = FinancialTransaction::new(
            TransactionType::Deposit,
            PAYMENT_SYSTEM_NAME,
            dec!(10.00),
            Currency::EUR,
        );

        let outcome = plugin.deposit(&mut tx).await;
        assert!(matches!(
            outcome.error(),
            Some(PaymentError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_void_without_authorization_is_invalid() {
        let plugin = plugin();
        let mut tx = transaction();

        let outcome = plugin.reverse_approval(&mut tx).await;
        assert!(matches!(
            outcome.error(),
            Some(PaymentError::InvalidRequest(_))
        ));
    }
}
