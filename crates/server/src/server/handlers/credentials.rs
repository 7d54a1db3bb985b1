//! Brokerage credential endpoints under `/api/brokerage/credentials`.
//!
//! The stored password never leaves the server: responses carry only the
//! login, the MFA flag and the last successful verification time.

use axum::{extract::State, Json};
use chrono::Utc;
use common::protocol::{
    CredentialResponse, MessageResponse, StoreCredentialRequest, VerifyResponse,
};
use common::ServiceError;
use tracing::info;

use crate::server::error::ApiResult;
use crate::server::extract::AuthUser;
use crate::server::state::AppState;
use crate::server::validation;

const NOT_FOUND: &str = "No brokerage credentials found";

/// `POST /api/brokerage/credentials` — encrypt and store (or replace) the caller's credential.
pub async fn store(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<StoreCredentialRequest>,
) -> ApiResult<Json<CredentialResponse>> {
    validation::credentials(&req)?;

    let replacing = state.credentials.has_credentials(user.id).await;
    let record = state
        .credentials
        .upsert(user.id, &req.email_or_phone, &req.password, req.mfa_enabled)
        .await?;
    info!(user_id = user.id, credential_id = record.id, replacing, "brokerage credentials stored");

    let message = if replacing {
        "Brokerage credentials updated successfully"
    } else {
        "Brokerage credentials stored successfully"
    };
    Ok(Json(CredentialResponse {
        message: Some(message.into()),
        credential: record.view(),
    }))
}

/// `GET /api/brokerage/credentials`
pub async fn get(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<CredentialResponse>> {
    let record = state
        .credentials
        .find_by_user_id(user.id)
        .await
        .ok_or_else(|| ServiceError::NotFound(NOT_FOUND.into()))?;
    Ok(Json(CredentialResponse {
        message: None,
        credential: record.view(),
    }))
}

/// `DELETE /api/brokerage/credentials`
pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<MessageResponse>> {
    if !state.credentials.delete(user.id).await {
        return Err(ServiceError::NotFound(NOT_FOUND.into()).into());
    }
    info!(user_id = user.id, "brokerage credentials deleted");
    Ok(Json(MessageResponse::new(
        "Brokerage credentials deleted successfully",
    )))
}

/// `POST /api/brokerage/credentials/verify` — prove the stored secret still
/// decrypts, then stamp `last_authenticated`.
pub async fn verify(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<VerifyResponse>> {
    state
        .credentials
        .decrypted(user.id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(NOT_FOUND.into()))?;

    let record = state
        .credentials
        .mark_authenticated(user.id)
        .await
        .ok_or_else(|| ServiceError::NotFound(NOT_FOUND.into()))?;
    info!(user_id = user.id, "brokerage credentials verified");

    Ok(Json(VerifyResponse {
        message: "Brokerage credentials verified".into(),
        last_authenticated: record.last_authenticated.unwrap_or_else(Utc::now),
    }))
}
