//! # Buybox Checkout
//!
//! Payment host for the Buybox express checkout.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables (or provide config/buybox.toml)
//! export BUYBOX_USERNAME=...
//! export BUYBOX_PASSWORD=...
//! export BUYBOX_SIGNATURE=...
//! export BUYBOX_DEBUG=true
//!
//! # Run the server
//! buybox-checkout
//! ```

use pay_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Payment plugins: {:?}", state.plugins.plugin_names());

    let app = routes::create_router(state);

    info!("Buybox checkout v{} starting on http://{}", env!("CARGO_PKG_VERSION"), addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Payments: POST http://{}/api/v1/payments", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
