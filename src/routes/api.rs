use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::api;
use crate::middleware::auth_middleware;
use crate::state::AppState;
use std::sync::Arc;

/// Create the versioned API router
///
/// The health check is mounted separately in main.rs.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/status", get(api::status))
        .route("/v1/voices", get(api::list_voices))
        .route("/v1/synthesize", post(api::synthesize))
        .route("/v1/merge", post(api::merge))
        .layer(TraceLayer::new_for_http())
}

/// API router behind the bearer-secret middleware
///
/// The middleware is a pass-through while `server.auth_required` is off.
pub fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    create_api_router().layer(middleware::from_fn_with_state(state, auth_middleware))
}
