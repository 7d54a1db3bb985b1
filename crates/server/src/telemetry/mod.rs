//! Structured logging setup.
//!
//! # Telemetry invariants
//!
//! - **No secrets** (brokerage passwords, key material, cipher tokens, session
//!   tokens, password hashes) may appear in any span attribute or log field.
//!   Failures are logged by category only.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`), overridden
//!   by `RUST_LOG` when set.

pub mod init;

pub use init::init_telemetry;
