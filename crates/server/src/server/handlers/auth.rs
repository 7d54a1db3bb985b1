//! Account endpoints under `/api/auth`.

use axum::{extract::State, http::StatusCode, Json};
use common::protocol::{
    AuthResponse, LoginRequest, MessageResponse, ProfileResponse, RegisterRequest,
    UpdateProfileRequest, UpdateProfileResponse,
};
use common::ServiceError;
use tracing::info;

use crate::auth::{hash_password, verify_password};
use crate::server::error::{ApiError, ApiResult};
use crate::server::extract::AuthUser;
use crate::server::state::AppState;
use crate::server::validation;
use crate::store::UserUpdate;

/// `POST /api/auth/register` — create an account and return a session token.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    validation::registration(&req)?;

    if state.users.find_by_email(&req.email).await.is_some() {
        return Err(ServiceError::Conflict("Email already registered".into()).into());
    }
    if state.users.find_by_username(&req.username).await.is_some() {
        return Err(ServiceError::Conflict("Username already taken".into()).into());
    }

    let password_hash = hash_blocking(req.password).await?;
    let user = state
        .users
        .create(&req.email, &req.username, password_hash)
        .await?;
    let token = state.tokens.issue(user.id, &user.email)?;
    info!(user_id = user.id, "account registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".into(),
            token,
            user: user.summary(),
        }),
    ))
}

/// `POST /api/auth/login` — exchange email and password for a session token.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    validation::login(&req)?;

    let invalid = || ApiError::from(ServiceError::Unauthorized("Invalid email or password".into()));

    let user = state.users.find_by_email(&req.email).await.ok_or_else(invalid)?;

    let hash = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || verify_password(&req.password, &hash))
        .await
        .map_err(|_| ServiceError::Internal("internal error".into()))?;
    if !verified {
        return Err(invalid());
    }

    let token = state.tokens.issue(user.id, &user.email)?;
    info!(user_id = user.id, "login succeeded");

    Ok(Json(AuthResponse {
        message: "Login successful".into(),
        token,
        user: user.summary(),
    }))
}

/// `GET /api/auth/profile`
pub async fn profile(AuthUser(user): AuthUser) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        user: user.profile(),
    })
}

/// `PUT /api/auth/profile` — partial update of email, username and password.
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UpdateProfileResponse>> {
    validation::profile_update(&req)?;

    let password_hash = match validation::non_empty(&req.password) {
        Some(p) => Some(hash_blocking(p.to_owned()).await?),
        None => None,
    };
    let update = UserUpdate {
        email: validation::non_empty(&req.email).map(str::to_owned),
        username: validation::non_empty(&req.username).map(str::to_owned),
        password_hash,
    };
    let updated = state.users.update(user.id, update).await?;

    Ok(Json(UpdateProfileResponse {
        message: "Profile updated successfully".into(),
        user: updated.summary(),
    }))
}

/// `DELETE /api/auth/profile` — remove the account and its stored credentials.
pub async fn delete_account(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<MessageResponse>> {
    let credentials_removed = state.credentials.delete(user.id).await;
    if !state.users.delete(user.id).await {
        return Err(ServiceError::NotFound("User not found".into()).into());
    }
    info!(user_id = user.id, credentials_removed, "account deleted");
    Ok(Json(MessageResponse::new("Account deleted successfully")))
}

/// Argon2 is CPU-bound; run it on the blocking pool.
async fn hash_blocking(password: String) -> ApiResult<String> {
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|_| ServiceError::Internal("internal error".into()))??;
    Ok(hash)
}
