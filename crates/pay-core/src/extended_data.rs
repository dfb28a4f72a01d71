//! # Extended Data
//!
//! Caller-owned key/value store carried on every [`FinancialTransaction`].
//! Plugins use it as the session state of multi-call flows (tokens, payer
//! ids, authorization ids) because nothing else survives between calls.
//!
//! [`FinancialTransaction`]: crate::FinancialTransaction

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known extended data keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtendedKey {
    /// Express checkout session token
    ExpressCheckoutToken,
    /// Gateway id of the authorization (or sale) to capture, refund or void
    AuthorizationId,
    /// Gateway payer id obtained after buyer consent
    PayerId,
    /// Per-transaction return URL override
    ReturnUrl,
    /// Per-transaction cancel URL override
    CancelUrl,
    /// Per-transaction notification URL override
    NotifyUrl,
    /// Per-transaction user action hint for the login page
    UserAction,
}

impl ExtendedKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtendedKey::ExpressCheckoutToken => "express_checkout_token",
            ExtendedKey::AuthorizationId => "authorization_id",
            ExtendedKey::PayerId => "buybox_payer_id",
            ExtendedKey::ReturnUrl => "return_url",
            ExtendedKey::CancelUrl => "cancel_url",
            ExtendedKey::NotifyUrl => "notify_url",
            ExtendedKey::UserAction => "useraction",
        }
    }
}

impl std::fmt::Display for ExtendedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Versioned key/value store.
///
/// `version` increases on every mutation so callers can detect that a
/// plugin call changed the stored state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendedData {
    #[serde(default)]
    version: u64,

    #[serde(default)]
    values: BTreeMap<String, String>,

    /// Extra fields forwarded verbatim when a checkout session is created
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    checkout_params: BTreeMap<String, String>,
}

impl ExtendedData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn has(&self, key: ExtendedKey) -> bool {
        self.has_raw(key.as_str())
    }

    pub fn get(&self, key: ExtendedKey) -> Option<&str> {
        self.get_raw(key.as_str())
    }

    pub fn set(&mut self, key: ExtendedKey, value: impl Into<String>) {
        self.set_raw(key.as_str(), value);
    }

    pub fn remove(&mut self, key: ExtendedKey) -> Option<String> {
        self.remove_raw(key.as_str())
    }

    /// Lookup by free-form key
    pub fn has_raw(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.as_str())
    }

    pub fn set_raw(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
        self.version += 1;
    }

    pub fn remove_raw(&mut self, key: &str) -> Option<String> {
        let removed = self.values.remove(key);
        if removed.is_some() {
            self.version += 1;
        }
        removed
    }

    /// Builder: set a well-known key
    pub fn with(mut self, key: ExtendedKey, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn checkout_params(&self) -> &BTreeMap<String, String> {
        &self.checkout_params
    }

    pub fn set_checkout_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.checkout_params.insert(key.into(), value.into());
        self.version += 1;
    }

    /// Builder: add a checkout parameter
    pub fn with_checkout_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_checkout_param(key, value);
        self
    }

    /// Iterate over all plain values
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_keys() {
        let mut data = ExtendedData::new();
        assert!(!data.has(ExtendedKey::ExpressCheckoutToken));

        data.set(ExtendedKey::ExpressCheckoutToken, "EC-123");
        assert_eq!(data.get(ExtendedKey::ExpressCheckoutToken), Some("EC-123"));
        assert_eq!(data.get_raw("express_checkout_token"), Some("EC-123"));
        assert_eq!(data.get_raw("buybox_payer_id"), None);
    }

    #[test]
    fn test_version_bumps_on_mutation() {
        let mut data = ExtendedData::new();
        assert_eq!(data.version(), 0);

        data.set(ExtendedKey::PayerId, "PAYER1");
        data.set_checkout_param("LOCALECODE", "FR");
        assert_eq!(data.version(), 2);

        assert_eq!(data.remove_raw("missing"), None);
        assert_eq!(data.version(), 2);

        assert_eq!(data.remove(ExtendedKey::PayerId), Some("PAYER1".to_string()));
        assert_eq!(data.version(), 3);
    }

    #[test]
    fn test_serde_roundtrip_keeps_checkout_params() {
        let data = ExtendedData::new()
            .with(ExtendedKey::ReturnUrl, "https://shop.example/return")
            .with_checkout_param("CUSTOM_PARAMETER", "CUSTOM_VALUE");

        let json = serde_json::to_string(&data).unwrap();
        let parsed: ExtendedData = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, data);
        assert_eq!(
            parsed.checkout_params().get("CUSTOM_PARAMETER"),
            Some(&"CUSTOM_VALUE".to_string())
        );
    }
}
