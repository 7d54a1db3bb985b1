//! Axum router construction.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, state::AppState};

/// Per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState) -> Router {
    let auth = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route(
            "/profile",
            get(handlers::auth::profile)
                .put(handlers::auth::update_profile)
                .delete(handlers::auth::delete_account),
        );

    let brokerage = Router::new()
        .route(
            "/credentials",
            post(handlers::credentials::store)
                .get(handlers::credentials::get)
                .delete(handlers::credentials::delete),
        )
        .route("/credentials/verify", post(handlers::credentials::verify));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/auth", auth)
        .nest("/api/brokerage", brokerage)
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}
