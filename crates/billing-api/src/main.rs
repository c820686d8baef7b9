//! # Exchequer
//!
//! Billing service receiving Adyen payment notifications.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export EXCHEQUER_BIND_ADDR=:8204
//! export EXCHEQUER_ADYEN_WEBHOOK_VERIFY_HMAC=true
//! export EXCHEQUER_ADYEN_WEBHOOK_HMAC_SECRET=44782DEF...
//!
//! # Run the server
//! exchequer
//! ```

use billing_api::{AppConfig, Logging, Server};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Print banner
    print_banner();

    let config = AppConfig::from_env()?;
    let logging = Logging::from_config(&config);

    logging.in_scope(|| {
        info!("Mode: {}", config.mode);
        info!("Listening on {}", config.listen_addr());
        if config.maintenance {
            warn!("Maintenance mode is on, only the probes will answer");
        }
        if config.is_debug() {
            info!("Status: GET /v1/status");
            info!("Webhook: POST /v1/adyen/payments");
        }
    });

    let server = Server::new(config, logging)?;
    server.start().await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  Exchequer
  ━━━━━━━━━━━━━━━━━━━━━━━
  Billing service
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
