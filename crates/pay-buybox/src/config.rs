//! # Buybox Configuration
//!
//! Credentials and plugin defaults, loaded from `BUYBOX_*` environment
//! variables (with `.env` support) or from a `[buybox]` TOML table.

use crate::auth::TokenAuthenticationStrategy;
use crate::client::BuyboxClient;
use crate::environment::Environment;
use crate::plugin::ExpressCheckoutPlugin;
use crate::transport::TransportOptions;
use pay_core::{PaymentError, PaymentResult};
use serde::Deserialize;
use std::env;
use std::time::Duration;
use tracing::info;

fn default_verify_ssl() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

/// Buybox API configuration
#[derive(Clone, Deserialize)]
pub struct BuyboxConfig {
    pub username: String,

    pub password: String,

    pub signature: String,

    #[serde(default)]
    pub return_url: Option<String>,

    #[serde(default)]
    pub cancel_url: Option<String>,

    #[serde(default)]
    pub notify_url: Option<String>,

    /// Appended to the buyer redirect (e.g. "commit")
    #[serde(default)]
    pub useraction: Option<String>,

    /// Talk to the sandbox instead of production
    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Deserialize)]
struct ConfigFile {
    buybox: BuyboxConfig,
}

impl BuyboxConfig {
    /// Create config with explicit credentials and defaults for the rest
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            signature: signature.into(),
            return_url: None,
            cancel_url: None,
            notify_url: None,
            useraction: None,
            debug: false,
            verify_ssl: default_verify_ssl(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `BUYBOX_USERNAME`
    /// - `BUYBOX_PASSWORD`
    /// - `BUYBOX_SIGNATURE`
    pub fn from_env() -> PaymentResult<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> PaymentResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| PaymentError::Configuration(format!("{} not set", key)))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let flag = |key: &str, default: bool| -> PaymentResult<bool> {
            match optional(key) {
                None => Ok(default),
                Some(v) => match v.to_ascii_lowercase().as_str() {
                    "1" | "true" | "yes" | "on" => Ok(true),
                    "0" | "false" | "no" | "off" => Ok(false),
                    _ => Err(PaymentError::Configuration(format!(
                        "{} must be a boolean, got {:?}",
                        key, v
                    ))),
                },
            }
        };

        let timeout_secs = match optional("BUYBOX_TIMEOUT_SECS") {
            None => default_timeout_secs(),
            Some(v) => v.parse().map_err(|_| {
                PaymentError::Configuration(format!(
                    "BUYBOX_TIMEOUT_SECS must be a number of seconds, got {:?}",
                    v
                ))
            })?,
        };

        let config = Self {
            username: required("BUYBOX_USERNAME")?,
            password: required("BUYBOX_PASSWORD")?,
            signature: required("BUYBOX_SIGNATURE")?,
            return_url: optional("BUYBOX_RETURN_URL"),
            cancel_url: optional("BUYBOX_CANCEL_URL"),
            notify_url: optional("BUYBOX_NOTIFY_URL"),
            useraction: optional("BUYBOX_USERACTION"),
            debug: flag("BUYBOX_DEBUG", false)?,
            verify_ssl: flag("BUYBOX_VERIFY_SSL", default_verify_ssl())?,
            timeout_secs,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the `[buybox]` table of a TOML document
    pub fn from_toml(content: &str) -> PaymentResult<Self> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| {
            PaymentError::Configuration(format!("Invalid buybox configuration: {}", e))
        })?;

        file.buybox.validate()?;
        Ok(file.buybox)
    }

    /// Check that the credentials are present
    pub fn validate(&self) -> PaymentResult<()> {
        for (name, value) in [
            ("username", &self.username),
            ("password", &self.password),
            ("signature", &self.signature),
        ] {
            if value.trim().is_empty() {
                return Err(PaymentError::Configuration(format!(
                    "buybox {} must not be empty",
                    name
                )));
            }
        }

        if self.timeout_secs == 0 {
            return Err(PaymentError::Configuration(
                "buybox timeout_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }

    pub fn environment(&self) -> Environment {
        Environment::from_debug(self.debug)
    }

    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions::default()
            .with_verify_ssl(self.verify_ssl)
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }

    pub fn authentication(&self) -> TokenAuthenticationStrategy {
        TokenAuthenticationStrategy::new(&self.username, &self.password, &self.signature)
    }

    /// Build a client for the configured environment
    pub fn build_client(&self) -> PaymentResult<BuyboxClient> {
        self.validate()?;
        BuyboxClient::with_options(
            self.authentication(),
            self.environment(),
            self.transport_options(),
        )
    }

    /// Build the express-checkout plugin with the configured defaults
    pub fn build_plugin(&self) -> PaymentResult<ExpressCheckoutPlugin> {
        let client = self.build_client()?;
        info!(
            "Buybox express checkout configured: environment={}, user={}",
            client.environment(),
            self.username
        );

        let mut plugin = ExpressCheckoutPlugin::new(client);
        if let Some(url) = &self.return_url {
            plugin = plugin.with_return_url(url);
        }
        if let Some(url) = &self.cancel_url {
            plugin = plugin.with_cancel_url(url);
        }
        if let Some(url) = &self.notify_url {
            plugin = plugin.with_notify_url(url);
        }
        if let Some(action) = &self.useraction {
            plugin = plugin.with_user_action(action);
        }

        Ok(plugin)
    }
}

impl std::fmt::Debug for BuyboxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuyboxConfig")
            .field("username", &self.username)
            .field("password", &"***")
            .field("signature", &"***")
            .field("return_url", &self.return_url)
            .field("cancel_url", &self.cancel_url)
            .field("notify_url", &self.notify_url)
            .field("useraction", &self.useraction)
            .field("debug", &self.debug)
            .field("verify_ssl", &self.verify_ssl)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    const CREDENTIALS: [(&str, &str); 3] = [
        ("BUYBOX_USERNAME", "api_user"),
        ("BUYBOX_PASSWORD", "api_pass"),
        ("BUYBOX_SIGNATURE", "api_sig"),
    ];

    #[test]
    fn test_from_lookup_defaults() {
        let config = BuyboxConfig::from_lookup(lookup(&CREDENTIALS)).unwrap();

        assert_eq!(config.username, "api_user");
        assert!(!config.debug);
        assert!(config.verify_ssl);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.environment(), Environment::Production);
        assert!(config.return_url.is_none());
    }

    #[test]
    fn test_from_lookup_all_keys() {
        let mut vars = CREDENTIALS.to_vec();
        vars.extend([
            ("BUYBOX_RETURN_URL", "https://shop.example/return"),
            ("BUYBOX_CANCEL_URL", "https://shop.example/cancel"),
            ("BUYBOX_NOTIFY_URL", ""),
            ("BUYBOX_USERACTION", "commit"),
            ("BUYBOX_DEBUG", "true"),
            ("BUYBOX_VERIFY_SSL", "0"),
            ("BUYBOX_TIMEOUT_SECS", "5"),
        ]);

        let config = BuyboxConfig::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.return_url.as_deref(), Some("https://shop.example/return"));
        assert_eq!(config.notify_url, None);
        assert_eq!(config.useraction.as_deref(), Some("commit"));
        assert_eq!(config.environment(), Environment::Sandbox);
        assert!(!config.transport_options().verify_ssl);
        assert_eq!(config.transport_options().timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_missing_credential() {
        let err = BuyboxConfig::from_lookup(lookup(&CREDENTIALS[..2])).unwrap_err();
        assert_eq!(
            err,
            PaymentError::Configuration("BUYBOX_SIGNATURE not set".to_string())
        );
    }

    #[test]
    fn test_invalid_flag() {
        let mut vars = CREDENTIALS.to_vec();
        vars.push(("BUYBOX_DEBUG", "maybe"));
        assert!(BuyboxConfig::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn test_from_toml() {
        let config = BuyboxConfig::from_toml(
            r#"
            [buybox]
            username = "api_user"
            password = "api_pass"
            signature = "api_sig"
            return_url = "https://shop.example/return"
            cancel_url = "https://shop.example/cancel"
            debug = true
            "#,
        )
        .unwrap();

        assert_eq!(config.environment(), Environment::Sandbox);
        assert!(config.verify_ssl);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.cancel_url.as_deref(), Some("https://shop.example/cancel"));
    }

    #[test]
    fn test_from_toml_rejects_empty_signature() {
        let err = BuyboxConfig::from_toml(
            r#"
            [buybox]
            username = "api_user"
            password = "api_pass"
            signature = " "
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, PaymentError::Configuration(_)));
    }

    #[test]
    fn test_build_plugin() {
        let mut config = BuyboxConfig::new("api_user", "api_pass", "api_sig");
        config.debug = true;
        config.return_url = Some("https://shop.example/return".into());

        let plugin = config.build_plugin().unwrap();
        assert_eq!(plugin.client().environment(), Environment::Sandbox);
        assert_eq!(
            plugin.client().endpoint(),
            "https://sandbox.buybox.net/secure/express-checkout/nvp.php"
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = BuyboxConfig::new("api_user", "api_pass", "api_sig");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("api_pass"));
        assert!(!debug.contains("api_sig"));
    }
}
