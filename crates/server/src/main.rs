//! `stockdeck-server` — API server binary entry point.
//!
//! `stockdeck-server generate-key` prints fresh credential key material and exits.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise structured logging.
//! 3. Load the credential key material and build the [`CredentialCipher`].
//! 4. Build the session token service and the in-memory stores.
//! 5. Build the Axum router and start the HTTP server.

mod auth;
mod config;
mod crypto;
mod server;
mod store;
mod telemetry;

use anyhow::{Context, Result};
use tracing::{info, warn};

use auth::TokenService;
use config::Config;
use crypto::CredentialCipher;
use server::state::AppState;
use store::CredentialStore;

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args().nth(1).as_deref() == Some("generate-key") {
        println!("{}", crypto::generate_key_material());
        return Ok(());
    }

    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.port,
        "stockdeck-server starting"
    );

    // -----------------------------------------------------------------------
    // 3. Key material
    // -----------------------------------------------------------------------
    let cipher = CredentialCipher::from_hex(cfg.encryption_key.as_deref())
        .context("failed to load ENCRYPTION_KEY")?;
    if !cipher.is_configured() {
        warn!("ENCRYPTION_KEY is not set; brokerage credential storage is disabled");
    }

    // -----------------------------------------------------------------------
    // 4. Services and stores
    // -----------------------------------------------------------------------
    let tokens = TokenService::new(&cfg.jwt_secret, cfg.jwt_expires_in_secs);
    let state = AppState::new(CredentialStore::new(cipher), tokens);

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let router = server::router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
