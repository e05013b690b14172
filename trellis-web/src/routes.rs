//! Route definitions for the Trellis web server

use crate::{handlers, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use trellis_core::RouteSettings;

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Idle-session lifecycle
        .route("/session", get(handlers::get_session))
        .route("/session/activity", post(handlers::record_activity))
        .route("/session/extend", post(handlers::extend_session))
        .route("/session/sign-out", post(handlers::sign_out_now))
        // Sign-in and the sign-out confirmation
        .route("/auth/sign-in", post(handlers::sign_in))
        .route("/auth/sign-out", get(handlers::sign_out_dialog))
        .route("/auth/sign-out/request", post(handlers::request_sign_out))
        .route("/auth/sign-out/cancel", post(handlers::cancel_sign_out))
        .route("/auth/sign-out/confirm", post(handlers::confirm_sign_out))
}

/// Create page routes; the auth, unauthorized and landing pages follow the
/// configured paths
pub fn page_routes(routes: &RouteSettings) -> Router<AppState> {
    Router::new()
        .route(&routes.auth_route, get(handlers::auth_page))
        .route(&routes.unauthorized_route, get(handlers::unauthorized_page))
        .route(&routes.default_landing_route, get(handlers::dashboard_page))
        .route("/projects", get(handlers::projects_page))
        .route(
            "/projects/{project_id}/resources",
            get(handlers::project_resources_page),
        )
        .route("/settings", get(handlers::settings_page))
        .route("/billing", get(handlers::billing_page))
        .route("/admin/system", get(handlers::system_admin_page))
}
