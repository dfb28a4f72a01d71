//! # Authentication Strategies
//!
//! Supplies the API endpoint and stamps credentials onto outgoing requests.
//! The client only talks to the trait, so other schemes can be swapped in.

use crate::environment::Environment;
use crate::transport::ApiRequest;
use std::fmt;

const API_CHECKOUT: &str = "https://www2.buybox.net/secure/express-checkout/nvp.php";
const API_CHECKOUT_SANDBOX: &str = "https://sandbox.buybox.net/secure/express-checkout/nvp.php";

/// Authentication scheme for the NVP API
pub trait AuthenticationStrategy: Send + Sync {
    /// Endpoint the NVP requests are posted to
    fn api_endpoint(&self, environment: Environment) -> String;

    /// Add credentials to the request
    fn authenticate(&self, request: &mut ApiRequest);
}

/// API username / password / signature triple
#[derive(Clone)]
pub struct TokenAuthenticationStrategy {
    username: String,
    password: String,
    signature: String,
}

impl TokenAuthenticationStrategy {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            signature: signature.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for TokenAuthenticationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthenticationStrategy")
            .field("username", &self.username)
            .field("password", &"***")
            .field("signature", &"***")
            .finish()
    }
}

impl AuthenticationStrategy for TokenAuthenticationStrategy {
    fn api_endpoint(&self, environment: Environment) -> String {
        match environment {
            Environment::Sandbox => API_CHECKOUT_SANDBOX.to_string(),
            Environment::Production => API_CHECKOUT.to_string(),
        }
    }

    fn authenticate(&self, request: &mut ApiRequest) {
        request.set_field("PWD", self.password.clone());
        request.set_field("USER", self.username.clone());
        request.set_field("SIGNATURE", self.signature.clone());
    }
}
