//! HTTP relay that places outbound voice calls for authenticated callers,
//! skipping numbers that were called inside the cooldown window.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod request;
pub mod state;

pub use config::{Config, ConfigError};
pub use error::RelayError;
pub use state::AppState;

/// Build the relay router. `/health` is public, `/` requires credentials.
pub fn router(state: Arc<AppState>) -> Router {
    let relay = Router::new()
        .route("/", post(handlers::relay_calls))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(relay)
        .with_state(state)
}
