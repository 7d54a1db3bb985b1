//! Conversion of service errors into JSON HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{protocol::ErrorResponse, ServiceError};
use tracing::{error, warn};

use crate::auth::{PasswordError, TokenError};
use crate::crypto::CipherError;
use crate::store::StoreError;

/// Handler error: a [`ServiceError`] rendered as [`ErrorResponse`] JSON.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = self.0.code();
        let body = match self.0 {
            ServiceError::Validation(errors) => {
                ErrorResponse::new(code, "request validation failed").with_errors(errors)
            }
            ServiceError::BadRequest(m)
            | ServiceError::Unauthorized(m)
            | ServiceError::Forbidden(m)
            | ServiceError::NotFound(m)
            | ServiceError::Conflict(m)
            | ServiceError::EncryptionFailure(m)
            | ServiceError::Unavailable(m)
            | ServiceError::Internal(m) => ErrorResponse::new(code, m),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self(e)
    }
}

impl From<CipherError> for ApiError {
    /// Every decrypt failure collapses into one opaque response so callers
    /// cannot tell a malformed token from a failed tag check.
    fn from(e: CipherError) -> Self {
        warn!(error = %e, "credential cipher operation failed");
        match e {
            CipherError::Configuration(_) => Self(ServiceError::Unavailable(
                "credential encryption is not configured".into(),
            )),
            CipherError::Encryption => Self(ServiceError::EncryptionFailure(
                "failed to encrypt credentials".into(),
            )),
            CipherError::InvalidTokenFormat | CipherError::AuthenticationFailure => Self(
                ServiceError::EncryptionFailure("failed to decrypt credentials".into()),
            ),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(m) => Self(ServiceError::Conflict(m)),
            StoreError::NotFound(m) => Self(ServiceError::NotFound(m)),
            StoreError::Cipher(c) => c.into(),
            StoreError::TaskFailed => {
                error!("cipher task failed");
                Self(ServiceError::Internal("internal error".into()))
            }
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Invalid => Self(ServiceError::Forbidden(e.to_string())),
            TokenError::Issue => {
                error!(error = %e, "session token signing failed");
                Self(ServiceError::Internal("internal error".into()))
            }
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(e: PasswordError) -> Self {
        error!(error = %e, "password hashing failed");
        Self(ServiceError::Internal("internal error".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key::KeyMaterialError;

    fn status_of(e: impl Into<ApiError>) -> StatusCode {
        e.into().into_response().status()
    }

    #[test]
    fn cipher_errors_map_to_status() {
        assert_eq!(
            status_of(CipherError::Configuration(KeyMaterialError::Missing)),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(CipherError::AuthenticationFailure),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn decrypt_failures_are_indistinguishable() {
        let a = ApiError::from(CipherError::InvalidTokenFormat).0;
        let b = ApiError::from(CipherError::AuthenticationFailure).0;
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a.code(), b.code());
    }

    #[test]
    fn store_errors_map_to_status() {
        assert_eq!(
            status_of(StoreError::Conflict("Email already registered".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(StoreError::NotFound("User not found".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(StoreError::TaskFailed), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_token_is_forbidden() {
        assert_eq!(status_of(TokenError::Invalid), StatusCode::FORBIDDEN);
    }
}
