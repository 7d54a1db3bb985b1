//! [`UserStore`]: accounts keyed by sequential id.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::protocol::{UserProfile, UserSummary};
use tokio::sync::RwLock;

use super::StoreError;

/// A stored account.
#[derive(Clone)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub username: String,
    /// Argon2 PHC string; never returned to callers.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            created_at: self.created_at,
        }
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Partial account update; `None` leaves a field unchanged.
#[derive(Debug, Default, Clone)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password_hash: Option<String>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    users: BTreeMap<u64, User>,
}

impl Inner {
    fn email_taken(&self, email: &str, except: Option<u64>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn username_taken(&self, username: &str, except: Option<u64>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }
}

/// Thread-safe account store.
#[derive(Clone, Default)]
pub struct UserStore {
    inner: Arc<RwLock<Inner>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the email or username is taken.
    pub async fn create(
        &self,
        email: &str,
        username: &str,
        password_hash: String,
    ) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.email_taken(email, None) {
            return Err(StoreError::Conflict("Email already registered".into()));
        }
        if inner.username_taken(username, None) {
            return Err(StoreError::Conflict("Username already taken".into()));
        }

        inner.next_id += 1;
        let now = Utc::now();
        let user = User {
            id: inner.next_id,
            email: email.to_owned(),
            username: username.to_owned(),
            password_hash,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    pub async fn find_by_id(&self, id: u64) -> Option<User> {
        self.inner.read().await.users.get(&id).cloned()
    }

    pub async fn find_by_email(&self, email: &str) -> Option<User> {
        let inner = self.inner.read().await;
        inner.users.values().find(|u| u.email == email).cloned()
    }

    pub async fn find_by_username(&self, username: &str) -> Option<User> {
        let inner = self.inner.read().await;
        inner.users.values().find(|u| u.username == username).cloned()
    }

    /// Apply a partial update and bump `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id and
    /// [`StoreError::Conflict`] if the new email or username belongs to
    /// another account.
    pub async fn update(&self, id: u64, update: UserUpdate) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&id) {
            return Err(StoreError::NotFound("User not found".into()));
        }
        if let Some(email) = &update.email {
            if inner.email_taken(email, Some(id)) {
                return Err(StoreError::Conflict("Email already registered".into()));
            }
        }
        if let Some(username) = &update.username {
            if inner.username_taken(username, Some(id)) {
                return Err(StoreError::Conflict("Username already taken".into()));
            }
        }

        let user = inner
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("User not found".into()))?;
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(username) = update.username {
            user.username = username;
        }
        if let Some(hash) = update.password_hash {
            user.password_hash = hash;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    /// Remove an account. Returns `true` if it existed.
    pub async fn delete(&self, id: u64) -> bool {
        self.inner.write().await.users.remove(&id).is_some()
    }
}
