//! Request and response types exchanged over the public HTTP API.
//!
//! Request bodies use the camelCase field names the web client sends; response
//! bodies use snake_case. Missing request fields deserialise to empty values so
//! that validation can report every problem at once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Request body for `POST /api/auth/register`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Request body for `POST /api/auth/login`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for `PUT /api/auth/profile`. Absent or empty fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Public view of an account, safe to return to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: u64,
    pub email: String,
    pub username: String,
}

/// [`UserSummary`] plus the account creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub email: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Response body for a successful register or login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    /// Signed session token to send as `Authorization: Bearer <token>`.
    pub token: String,
    pub user: UserSummary,
}

/// Response body for `GET /api/auth/profile`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: UserProfile,
}

/// Response body for `PUT /api/auth/profile`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProfileResponse {
    pub message: String,
    pub user: UserSummary,
}

// ---------------------------------------------------------------------------
// Brokerage credentials
// ---------------------------------------------------------------------------

/// Request body for `POST /api/brokerage/credentials`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreCredentialRequest {
    /// Brokerage login: an email address or phone number.
    pub email_or_phone: String,
    /// Brokerage password. Encrypted before it is stored and never echoed back.
    pub password: String,
    pub mfa_enabled: bool,
}

/// A stored brokerage credential without its secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialView {
    pub id: u64,
    pub email_or_phone: String,
    pub mfa_enabled: bool,
    pub last_authenticated: Option<DateTime<Utc>>,
}

/// Response body for credential reads and writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub credential: CredentialView,
}

/// Response body for `POST /api/brokerage/credentials/verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub message: String,
    pub last_authenticated: DateTime<Utc>,
}

/// Response body carrying only a human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
    /// Individual validation messages, when the request failed validation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// Attach individual validation messages.
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Whether credential key material is configured.
    pub encryption_ready: bool,
}
