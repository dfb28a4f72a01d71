//! # Environment
//!
//! Sandbox vs. production endpoints, resolved once when a client is built.

use serde::{Deserialize, Serialize};

const API_LOGIN: &str = "https://www2.buybox.net/secure/payment_login.php";
const API_LOGIN_SANDBOX: &str = "https://sandbox.buybox.net/secure/payment_login.php";

/// Gateway environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Sandbox,
    #[default]
    Production,
}

impl Environment {
    /// Map the legacy `debug` switch: debug talks to the sandbox
    pub fn from_debug(debug: bool) -> Self {
        if debug {
            Environment::Sandbox
        } else {
            Environment::Production
        }
    }

    pub fn is_sandbox(&self) -> bool {
        matches!(self, Environment::Sandbox)
    }

    /// Base URL of the buyer login / consent page
    pub fn login_url(&self) -> &'static str {
        match self {
            Environment::Sandbox => API_LOGIN_SANDBOX,
            Environment::Production => API_LOGIN,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Sandbox => f.write_str("sandbox"),
            Environment::Production => f.write_str("production"),
        }
    }
}
