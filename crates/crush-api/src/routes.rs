use axum::{
    Router,
    routing::{get, post},
};

use crate::auth::{self, AppState};
use crate::choices;

/// Login and matchmaking pages.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/login", post(auth::login))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/choices", get(choices::choices))
        .route("/submit-choices", post(choices::submit_choices))
        .with_state(state)
}
