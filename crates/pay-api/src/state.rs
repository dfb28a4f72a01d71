//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the plugin registry, the payment store and configuration.

use crate::store::PaymentStore;
use pay_buybox::BuyboxConfig;
use pay_core::{BoxedPaymentPlugin, PluginRegistry};
use std::net::SocketAddr;
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Base URL for buyer return/cancel callbacks
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Where the gateway sends the buyer after consent
    pub fn return_url(&self) -> String {
        format!("{}/checkout/return", self.base_url.trim_end_matches('/'))
    }

    /// Where the gateway sends the buyer after cancelling
    pub fn cancel_url(&self) -> String {
        format!("{}/checkout/cancel", self.base_url.trim_end_matches('/'))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment plugins
    pub plugins: PluginRegistry,
    /// In-memory payments
    pub payments: PaymentStore,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create a new AppState with the Buybox express-checkout plugin
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let mut buybox = load_buybox_config()?;
        if buybox.return_url.is_none() {
            buybox.return_url = Some(config.return_url());
        }
        if buybox.cancel_url.is_none() {
            buybox.cancel_url = Some(config.cancel_url());
        }

        let plugin = buybox
            .build_plugin()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Buybox: {}", e))?;

        let plugins = PluginRegistry::new().with_plugin(Arc::new(plugin) as BoxedPaymentPlugin);

        Ok(Self::with_plugins(config, plugins))
    }

    /// Create state around an existing registry
    pub fn with_plugins(config: AppConfig, plugins: PluginRegistry) -> Self {
        Self {
            plugins,
            payments: PaymentStore::new(),
            config,
        }
    }

    /// Plugin responsible for a payment system
    pub fn plugin(&self, payment_system: &str) -> Option<&BoxedPaymentPlugin> {
        self.plugins.find(payment_system)
    }
}

/// Load Buybox configuration from config/buybox.toml, falling back to the environment
fn load_buybox_config() -> anyhow::Result<BuyboxConfig> {
    let config_paths = [
        "config/buybox.toml",
        "../config/buybox.toml",
        "../../config/buybox.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let config = BuyboxConfig::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            tracing::info!("Loaded Buybox configuration from {}", path);
            return Ok(config);
        }
    }

    BuyboxConfig::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load Buybox configuration: {}", e))
}
