//! [`CredentialStore`]: one encrypted brokerage credential per account.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::protocol::CredentialView;
use tokio::sync::RwLock;
use zeroize::Zeroizing;

use super::StoreError;
use crate::crypto::{CipherError, CredentialCipher};

/// A stored credential row. `password_encrypted` is the opaque cipher token.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub id: u64,
    // Stored columns with no reader yet; kept so a row maps one-to-one onto the table.
    #[allow(dead_code)]
    pub user_id: u64,
    pub email_or_phone: String,
    pub password_encrypted: String,
    pub mfa_enabled: bool,
    pub created_at: DateTime<Utc>,
    #[allow(dead_code)]
    pub updated_at: DateTime<Utc>,
    pub last_authenticated: Option<DateTime<Utc>>,
}

impl CredentialRecord {
    /// The caller-facing view, without the encrypted secret.
    pub fn view(&self) -> CredentialView {
        CredentialView {
            id: self.id,
            email_or_phone: self.email_or_phone.clone(),
            mfa_enabled: self.mfa_enabled,
            last_authenticated: self.last_authenticated,
        }
    }
}

/// A credential with its secret decrypted, for immediate use by the caller.
/// The plaintext is wiped when the value is dropped.
pub struct DecryptedCredential {
    pub record: CredentialRecord,
    // No handler reads the plaintext; `verify` only needs the decrypt to succeed.
    #[allow(dead_code)]
    pub password: Zeroizing<String>,
}

impl std::fmt::Debug for DecryptedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptedCredential")
            .field("record", &self.record)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    by_user: HashMap<u64, CredentialRecord>,
}

/// Thread-safe credential store. Secrets are encrypted with the shared
/// [`CredentialCipher`] before they reach the map.
#[derive(Clone)]
pub struct CredentialStore {
    cipher: CredentialCipher,
    inner: Arc<RwLock<Inner>>,
}

impl CredentialStore {
    pub fn new(cipher: CredentialCipher) -> Self {
        Self {
            cipher,
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    /// Whether the underlying cipher has key material.
    pub fn encryption_ready(&self) -> bool {
        self.cipher.is_configured()
    }

    /// Insert or replace the credential for `user_id`.
    ///
    /// A replacement keeps the row id, `created_at` and `last_authenticated`
    /// but always stores a freshly encrypted token.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Cipher`] if encryption fails; nothing is written.
    pub async fn upsert(
        &self,
        user_id: u64,
        email_or_phone: &str,
        password: &str,
        mfa_enabled: bool,
    ) -> Result<CredentialRecord, StoreError> {
        let password_encrypted = self.run_cipher(password.to_owned(), |c, p| c.encrypt(&p)).await?;

        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let (id, created_at, last_authenticated) = match inner.by_user.get(&user_id) {
            Some(existing) => (existing.id, existing.created_at, existing.last_authenticated),
            None => {
                inner.next_id += 1;
                (inner.next_id, now, None)
            }
        };
        let record = CredentialRecord {
            id,
            user_id,
            email_or_phone: email_or_phone.to_owned(),
            password_encrypted,
            mfa_enabled,
            created_at,
            updated_at: now,
            last_authenticated,
        };
        inner.by_user.insert(user_id, record.clone());
        Ok(record)
    }

    pub async fn find_by_user_id(&self, user_id: u64) -> Option<CredentialRecord> {
        self.inner.read().await.by_user.get(&user_id).cloned()
    }

    /// Load and decrypt the credential for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Cipher`] if the stored token does not decrypt.
    pub async fn decrypted(&self, user_id: u64) -> Result<Option<DecryptedCredential>, StoreError> {
        let Some(record) = self.find_by_user_id(user_id).await else {
            return Ok(None);
        };
        let password = Zeroizing::new(
            self.run_cipher(record.password_encrypted.clone(), |c, t| c.decrypt(&t))
                .await?,
        );
        Ok(Some(DecryptedCredential { record, password }))
    }

    /// Stamp `last_authenticated` with the current time.
    pub async fn mark_authenticated(&self, user_id: u64) -> Option<CredentialRecord> {
        let mut inner = self.inner.write().await;
        let record = inner.by_user.get_mut(&user_id)?;
        record.last_authenticated = Some(Utc::now());
        Some(record.clone())
    }

    /// Remove the credential for `user_id`. Returns `true` if one existed.
    pub async fn delete(&self, user_id: u64) -> bool {
        self.inner.write().await.by_user.remove(&user_id).is_some()
    }

    pub async fn has_credentials(&self, user_id: u64) -> bool {
        self.inner.read().await.by_user.contains_key(&user_id)
    }

    /// A handle over the same rows that uses different key material.
    #[cfg(test)]
    pub(crate) fn rekeyed(&self, cipher: CredentialCipher) -> Self {
        Self {
            cipher,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Run a cipher operation on the blocking pool; PBKDF2 is CPU-bound.
    async fn run_cipher<F>(&self, input: String, op: F) -> Result<String, StoreError>
    where
        F: FnOnce(&CredentialCipher, String) -> Result<String, CipherError> + Send + 'static,
    {
        let cipher = self.cipher.clone();
        tokio::task::spawn_blocking(move || op(&cipher, input))
            .await
            .map_err(|_| StoreError::TaskFailed)?
            .map_err(StoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key::KEY_LEN;

    fn store() -> CredentialStore {
        CredentialStore::new(CredentialCipher::from_hex(Some(&"42".repeat(KEY_LEN))).unwrap())
    }

    #[tokio::test]
    async fn upsert_encrypts_and_decrypts() {
        let store = store();
        let record = store.upsert(1, "trader@example.com", "hunter2", true).await.unwrap();
        assert_ne!(record.password_encrypted, "hunter2");
        assert_eq!(record.password_encrypted.split(':').count(), 4);
        assert!(record.mfa_enabled);

        let decrypted = store.decrypted(1).await.unwrap().unwrap();
        assert_eq!(decrypted.password.as_str(), "hunter2");
        assert_eq!(decrypted.record.email_or_phone, "trader@example.com");
        assert!(!format!("{decrypted:?}").contains("hunter2"));
    }

    #[tokio::test]
    async fn upsert_replaces_but_keeps_identity() {
        let store = store();
        let first = store.upsert(1, "old@example.com", "pw1", false).await.unwrap();
        let second = store.upsert(1, "new@example.com", "pw2", true).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
        assert_ne!(first.password_encrypted, second.password_encrypted);
        assert_eq!(store.decrypted(1).await.unwrap().unwrap().password.as_str(), "pw2");

        let other = store.upsert(2, "x@example.com", "pw", false).await.unwrap();
        assert_eq!(other.id, first.id + 1);
    }

    #[tokio::test]
    async fn missing_credentials() {
        let store = store();
        assert!(store.find_by_user_id(1).await.is_none());
        assert!(store.decrypted(1).await.unwrap().is_none());
        assert!(store.mark_authenticated(1).await.is_none());
        assert!(!store.has_credentials(1).await);
        assert!(!store.delete(1).await);
    }

    #[tokio::test]
    async fn mark_authenticated_and_delete() {
        let store = store();
        store.upsert(1, "555-0100", "pw", false).await.unwrap();
        assert!(store.has_credentials(1).await);

        let marked = store.mark_authenticated(1).await.unwrap();
        assert!(marked.last_authenticated.is_some());
        assert_eq!(marked.view().last_authenticated, marked.last_authenticated);

        let replaced = store.upsert(1, "555-0199", "pw2", false).await.unwrap();
        assert_eq!(replaced.last_authenticated, marked.last_authenticated);

        assert!(store.delete(1).await);
        assert!(!store.has_credentials(1).await);
    }

    #[tokio::test]
    async fn unconfigured_cipher_writes_nothing() {
        let store = CredentialStore::new(CredentialCipher::unconfigured());
        assert!(!store.encryption_ready());
        let err = store.upsert(1, "a@b.co", "pw", false).await.unwrap_err();
        assert!(matches!(err, StoreError::Cipher(CipherError::Configuration(_))));
        assert!(!store.has_credentials(1).await);
    }

    #[tokio::test]
    async fn corrupted_row_fails_to_decrypt() {
        let store = store();
        store.upsert(1, "a@b.co", "pw", false).await.unwrap();
        store
            .inner
            .write()
            .await
            .by_user
            .get_mut(&1)
            .unwrap()
            .password_encrypted = "garbage".into();
        assert!(matches!(
            store.decrypted(1).await,
            Err(StoreError::Cipher(CipherError::InvalidTokenFormat))
        ));
    }
}
