//! In-memory account and credential stores.
//!
//! Both stores are cheap `Clone` handles over `Arc<RwLock<_>>`: many request
//! handlers may read concurrently while writes take a short exclusive lock.
//! Cipher work happens outside the lock so a slow PBKDF2 derivation never
//! blocks readers.

pub mod credentials;
pub mod users;

pub use credentials::CredentialStore;
pub use users::{User, UserStore, UserUpdate};

use thiserror::Error;

use crate::crypto::CipherError;

/// Errors produced by the store layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write collides with an existing row (duplicate email or username).
    #[error("{0}")]
    Conflict(String),

    /// The row being updated does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Encrypting or decrypting the stored secret failed.
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// The blocking task running the cipher panicked or was cancelled.
    #[error("cipher task failed")]
    TaskFailed,
}
