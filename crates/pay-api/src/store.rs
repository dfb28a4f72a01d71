//! # Payment Store
//!
//! In-memory payments. Each payment sits behind its own mutex so that plugin
//! operations on one payment run one at a time while other payments proceed.

use chrono::{DateTime, Utc};
use pay_core::{ExtendedKey, FinancialTransaction};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// A payment: its approval transaction plus every follow-up run against it
#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub id: String,
    pub approval: FinancialTransaction,
    pub follow_ups: Vec<FinancialTransaction>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(approval: FinancialTransaction) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            approval,
            follow_ups: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Checkout token stored by the plugin, if any
    pub fn checkout_token(&self) -> Option<&str> {
        self.approval
            .extended_data
            .get(ExtendedKey::ExpressCheckoutToken)
    }
}

pub type SharedPayment = Arc<Mutex<Payment>>;

/// Payments keyed by id
#[derive(Clone, Default)]
pub struct PaymentStore {
    payments: Arc<RwLock<HashMap<String, SharedPayment>>>,
}

impl PaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, payment: Payment) -> SharedPayment {
        let id = payment.id.clone();
        let shared = Arc::new(Mutex::new(payment));
        self.payments.write().await.insert(id, shared.clone());
        shared
    }

    pub async fn get(&self, id: &str) -> Option<SharedPayment> {
        self.payments.read().await.get(id).cloned()
    }

    /// Payment whose approval holds `token`
    pub async fn find_by_token(&self, token: &str) -> Option<SharedPayment> {
        let candidates: Vec<SharedPayment> = self.payments.read().await.values().cloned().collect();

        for payment in candidates {
            if payment.lock().await.checkout_token() == Some(token) {
                return Some(payment);
            }
        }
        None
    }

    pub async fn len(&self) -> usize {
        self.payments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.payments.read().await.is_empty()
    }
}
