//! Tracking web server.
//!
//! Answers open-pixel, click-redirect and interest-form requests. Every
//! request names its campaign before its token, and no response ever tells
//! the caller whether the campaign or token was valid.

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    health, submit_interest, track_click, track_open, AppState, HealthResponse, NO_STORE,
    TRACKING_PIXEL,
};

/// Build the tracking router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/track/open/:campaign/:token", get(track_open))
        .route("/track/click/:campaign/:token/:kind", get(track_click))
        .route("/track/interest/:campaign/:token", post(submit_interest))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
