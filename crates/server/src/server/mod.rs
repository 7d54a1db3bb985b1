//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Authenticate callers from their bearer session token.
//! - Inject shared application state (`AppState`) into handlers.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod state;
pub mod validation;
