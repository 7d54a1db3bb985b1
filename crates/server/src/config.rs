//! Configuration loading and validation for the API server.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::crypto::KeyMaterial;

/// Validated server configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Hex-encoded 32-byte credential key material. Optional: without it the
    /// server runs but every credential encrypt/decrypt fails.
    #[serde(default)]
    pub encryption_key: Option<String>,

    /// HMAC secret used to sign session tokens. **Required.**
    pub jwt_secret: String,

    /// Session token lifetime in seconds.
    #[serde(default = "default_jwt_expires_in")]
    pub jwt_expires_in_secs: u64,

    /// Port the HTTP server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_jwt_expires_in() -> u64 {
    7 * 24 * 60 * 60
}
fn default_port() -> u16 {
    5000
}
fn default_log_level() -> String {
    "info".into()
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("encryption_key", &self.encryption_key.as_ref().map(|_| "[REDACTED]"))
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expires_in_secs", &self.jwt_expires_in_secs)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_environment(config::Environment::default())
    }

    fn from_environment(env: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(env)
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.jwt_secret, "JWT_SECRET")?;

        if let Some(key) = &self.encryption_key {
            KeyMaterial::from_hex(key).context("ENCRYPTION_KEY is invalid")?;
        }
        if self.jwt_expires_in_secs == 0 {
            anyhow::bail!("JWT_EXPIRES_IN_SECS must be > 0");
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
