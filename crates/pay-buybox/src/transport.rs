//! # Transport Types
//!
//! Request/response envelopes for the HTTP exchange with the gateway, and
//! the options used to build the underlying `reqwest` client.

use pay_core::{PaymentError, PaymentResult};
use reqwest::{Client, Method};
use std::collections::BTreeMap;
use std::time::Duration;

/// Flat name/value fields of an NVP request
pub type Fields = BTreeMap<String, String>;

/// Content type that switches the body from URL-encoding to multipart
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// An outgoing request, built fresh for every call
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub url: String,
    pub method: Method,
    pub fields: Fields,
    pub headers: Vec<(String, String)>,
    pub content_type: Option<String>,
}

impl ApiRequest {
    /// POST request carrying `fields` as a form body
    pub fn post(url: impl Into<String>, fields: Fields) -> Self {
        Self {
            url: url.into(),
            method: Method::POST,
            fields,
            headers: Vec::new(),
            content_type: None,
        }
    }

    pub fn set_field(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Builder: add a request header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Builder: send the fields as `multipart/form-data`
    pub fn multipart(mut self) -> Self {
        self.content_type = Some(MULTIPART_FORM_DATA.to_string());
        self
    }

    pub fn is_multipart(&self) -> bool {
        self.content_type.as_deref() == Some(MULTIPART_FORM_DATA)
    }

    /// Field names plus the `METHOD` value, safe to log
    pub fn describe(&self) -> String {
        let method = self.fields.get("METHOD").map(|m| m.as_str()).unwrap_or("-");
        let names: Vec<&str> = self.fields.keys().map(|k| k.as_str()).collect();
        format!("{} [{}]", method, names.join(","))
    }
}

/// Raw HTTP reply, split into status, headers and body
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    /// Header map; the last occurrence of a repeated header wins
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// Options for the HTTP client
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Verify the server certificate and host name.
    ///
    /// Turning this off is only meant for hosts with outdated trust stores.
    pub verify_ssl: bool,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            verify_ssl: true,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("buybox-checkout-rs/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl TransportOptions {
    /// Builder: toggle certificate verification
    pub fn with_verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = verify;
        self
    }

    /// Builder: set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the `reqwest` client
    pub fn build_client(&self) -> PaymentResult<Client> {
        Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.clone())
            .danger_accept_invalid_certs(!self.verify_ssl)
            .build()
            .map_err(|e| {
                PaymentError::Configuration(format!("Failed to create HTTP client: {}", e))
            })
    }
}
