//! # Financial Transactions
//!
//! The caller-owned transaction record that plugins read and mutate.

use crate::currency::Currency;
use crate::extended_data::ExtendedData;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Response code recorded on a successful transaction
pub const RESPONSE_CODE_SUCCESS: &str = "success";

/// Response code recorded when the gateway reports a terminal failure status
pub const RESPONSE_CODE_FAILED: &str = "Failed";

/// Reason code recorded on a successful transaction
pub const REASON_CODE_SUCCESS: &str = "none";

/// Kind of operation a transaction represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Authorize only
    Approve,
    /// Authorize and capture in one step
    ApproveAndDeposit,
    /// Capture a prior authorization
    Deposit,
    /// Refund
    Credit,
    /// Void an authorization
    ReverseApproval,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Approve => "approve",
            TransactionType::ApproveAndDeposit => "approve_and_deposit",
            TransactionType::Deposit => "deposit",
            TransactionType::Credit => "credit",
            TransactionType::ReverseApproval => "reverse_approval",
        }
    }

    /// Approval operations start a payment; everything else follows one
    pub fn is_approval(&self) -> bool {
        matches!(
            self,
            TransactionType::Approve | TransactionType::ApproveAndDeposit
        )
    }
}

/// Transaction state as seen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    /// Created, no plugin call has finished it yet
    New,
    /// Waiting for buyer consent or asynchronous settlement
    Pending,
    /// Completed successfully
    Success,
    /// Terminally failed
    Failed,
}

impl Default for TransactionState {
    fn default() -> Self {
        TransactionState::New
    }
}

/// What a follow-up operation needs to know about the payment's approval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    /// Gateway reference of the approval (authorization or sale id)
    pub reference_number: String,
    /// Amount the payment was approved for
    pub approved_amount: Decimal,
    /// Amount the gateway reported as processed by the approval
    pub processed_amount: Decimal,
}

/// A financial transaction owned by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialTransaction {
    /// Unique transaction ID (generated)
    pub id: String,

    pub transaction_type: TransactionType,

    /// Payment system the transaction is routed to (e.g. "buybox_express_checkout")
    pub payment_system: String,

    pub requested_amount: Decimal,

    pub currency: Currency,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_amount: Option<Decimal>,

    /// Gateway reference (transaction id, refund id, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,

    #[serde(default)]
    pub state: TransactionState,

    #[serde(default)]
    pub extended_data: ExtendedData,

    /// Approval this transaction follows (deposit, credit, reverse approval)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval: Option<ApprovalRecord>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl FinancialTransaction {
    /// Create a new transaction with generated ID
    pub fn new(
        transaction_type: TransactionType,
        payment_system: impl Into<String>,
        requested_amount: Decimal,
        currency: Currency,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            transaction_type,
            payment_system: payment_system.into(),
            requested_amount,
            currency,
            processed_amount: None,
            reference_number: None,
            response_code: None,
            reason_code: None,
            state: TransactionState::New,
            extended_data: ExtendedData::new(),
            approval: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder: replace extended data
    pub fn with_extended_data(mut self, data: ExtendedData) -> Self {
        self.extended_data = data;
        self
    }

    /// Builder: attach the approval this transaction follows
    pub fn with_approval(mut self, approval: ApprovalRecord) -> Self {
        self.approval = Some(approval);
        self
    }

    /// Record a successful outcome
    pub fn mark_success(&mut self) {
        self.response_code = Some(RESPONSE_CODE_SUCCESS.to_string());
        self.reason_code = Some(REASON_CODE_SUCCESS.to_string());
        self.state = TransactionState::Success;
        self.touch();
    }

    /// Record gateway response/reason codes of a failure
    pub fn mark_failed(&mut self, response_code: Option<String>, reason_code: Option<String>) {
        self.response_code = response_code;
        self.reason_code = reason_code;
        self.state = TransactionState::Failed;
        self.touch();
    }

    pub fn mark_pending(&mut self) {
        self.state = TransactionState::Pending;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn is_success(&self) -> bool {
        self.state == TransactionState::Success
    }

    /// Approval record for follow-up operations.
    ///
    /// Only a successful approval with a reference number yields one.
    pub fn approval_record(&self) -> Option<ApprovalRecord> {
        if !self.transaction_type.is_approval() || !self.is_success() {
            return None;
        }

        let reference_number = self.reference_number.clone()?;

        Some(ApprovalRecord {
            reference_number,
            approved_amount: self.requested_amount,
            processed_amount: self.processed_amount.unwrap_or(self.requested_amount),
        })
    }

    /// Derive a follow-up transaction (deposit, credit, reverse approval)
    /// sharing this transaction's currency, payment system and extended data.
    pub fn follow_up(&self, transaction_type: TransactionType, requested_amount: Decimal) -> Self {
        let mut follow_up = Self::new(
            transaction_type,
            self.payment_system.clone(),
            requested_amount,
            self.currency,
        )
        .with_extended_data(self.extended_data.clone());
        follow_up.approval = self.approval_record().or_else(|| self.approval.clone());
        follow_up
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extended_data::ExtendedKey;
    use rust_decimal_macros::dec;

    fn approved(amount: Decimal) -> FinancialTransaction {
        let mut tx = FinancialTransaction::new(
            TransactionType::Approve,
            "buybox_express_checkout",
            amount,
            Currency::EUR,
        );
        tx.reference_number = Some("AUTH-1".to_string());
        tx.processed_amount = Some(amount);
        tx.mark_success();
        tx
    }

    #[test]
    fn test_new_transaction_is_new() {
        let tx = FinancialTransaction::new(
            TransactionType::Approve,
            "buybox_express_checkout",
            dec!(10.00),
            Currency::EUR,
        );
        assert_eq!(tx.state, TransactionState::New);
        assert!(tx.approval_record().is_none());
        assert!(tx.response_code.is_none());
    }

    #[test]
    fn test_mark_success_sets_codes() {
        let tx = approved(dec!(100.00));
        assert_eq!(tx.response_code.as_deref(), Some(RESPONSE_CODE_SUCCESS));
        assert_eq!(tx.reason_code.as_deref(), Some(REASON_CODE_SUCCESS));
        assert!(tx.is_success());
    }

    #[test]
    fn test_follow_up_inherits_approval() {
        let mut approval = approved(dec!(100.00));
        approval
            .extended_data
            .set(ExtendedKey::AuthorizationId, "AUTH-1");

        let deposit = approval.follow_up(TransactionType::Deposit, dec!(60.00));

        assert_eq!(deposit.transaction_type, TransactionType::Deposit);
        assert_eq!(deposit.requested_amount, dec!(60.00));
        assert_eq!(deposit.currency, Currency::EUR);
        assert_eq!(
            deposit.extended_data.get(ExtendedKey::AuthorizationId),
            Some("AUTH-1")
        );

        let record = deposit.approval.unwrap();
        assert_eq!(record.reference_number, "AUTH-1");
        assert_eq!(record.approved_amount, dec!(100.00));
    }

    #[test]
    fn test_failed_approval_has_no_record() {
        let mut tx = approved(dec!(5.00));
        tx.mark_failed(Some("Failure".into()), Some("10001".into()));
        assert!(tx.approval_record().is_none());
    }
}
