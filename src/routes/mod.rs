use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{apply_security_headers, create_cors_layer, hsts_enabled_from_env};
use crate::handlers::{health_check, issue_credential, purge_expired, scan, AppState};

pub fn create_routes(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        .route("/tickets/:id/credential", post(issue_credential))
        .route("/scan", post(scan))
        .route("/maintenance/purge-expired", post(purge_expired))
        .with_state(state)
        .layer(create_cors_layer())
        .layer(TraceLayer::new_for_http());

    apply_security_headers(router, hsts_enabled_from_env())
}
