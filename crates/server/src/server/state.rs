//! Shared application state injected into every Axum handler.

use crate::auth::TokenService;
use crate::store::{CredentialStore, UserStore};

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable (`Arc`-backed) so that Axum can clone the
/// state for each request without copying expensive data.
#[derive(Clone)]
pub struct AppState {
    /// Registered accounts.
    pub users: UserStore,
    /// Encrypted brokerage credentials, one per account.
    pub credentials: CredentialStore,
    /// Session token issuer/verifier.
    pub tokens: TokenService,
}

impl AppState {
    /// Create a new [`AppState`] with empty stores.
    pub fn new(credentials: CredentialStore, tokens: TokenService) -> Self {
        Self {
            users: UserStore::new(),
            credentials,
            tokens,
        }
    }

    /// State with zeroed key material and a fixed token secret, for tests.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        use crate::crypto::key::KEY_LEN;
        use crate::crypto::CredentialCipher;

        let cipher = CredentialCipher::from_hex(Some(&"00".repeat(KEY_LEN)))
            .expect("zero key material is well-formed");
        Self::new(
            CredentialStore::new(cipher),
            TokenService::new("test-secret", 3600),
        )
    }
}
