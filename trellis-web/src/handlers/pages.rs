//! Page routes
//!
//! Each protected page declares its requirement and hands the request to
//! the route guard before rendering.

use crate::auth::{enforce, require_auth, CurrentAccess, RedirectNavigator};
use crate::templates::{
    AccessDeniedTemplate, BillingTemplate, DashboardTemplate, HtmlTemplate, ProjectsTemplate,
    ResourcesTemplate, SettingsTemplate, SignInTemplate, SystemAdminTemplate,
};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::Uri,
    response::{IntoResponse, Response},
};
use trellis_access::{
    redirect_authenticated_away, CapabilityGuard, Permission, RequireAuthOptions, Role,
    RouteRequirement,
};

/// Sign-in page; signed-in users are sent on to where they were going
pub async fn auth_page(
    State(state): State<AppState>,
    CurrentAccess(access): CurrentAccess,
    uri: Uri,
) -> Response {
    let navigator = RedirectNavigator::for_uri(&uri);
    if redirect_authenticated_away(&access, &navigator, state.routes()).is_some() {
        if let Some(redirect) = navigator.into_redirect() {
            return redirect.into_response();
        }
    }
    HtmlTemplate(SignInTemplate::new()).into_response()
}

pub async fn unauthorized_page() -> HtmlTemplate<AccessDeniedTemplate> {
    HtmlTemplate(AccessDeniedTemplate::new())
}

pub async fn dashboard_page(
    State(state): State<AppState>,
    CurrentAccess(access): CurrentAccess,
    uri: Uri,
) -> Response {
    let user = match enforce(&state, &access, &uri, RouteRequirement::authenticated()) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let show_settings_link = CapabilityGuard::admin_only().render(&access, || ()).is_some();
    HtmlTemplate(DashboardTemplate::new(&user, show_settings_link)).into_response()
}

pub async fn projects_page(
    State(state): State<AppState>,
    CurrentAccess(access): CurrentAccess,
    uri: Uri,
) -> Response {
    let requirement = RouteRequirement::authenticated().permission(Permission::PROJECTS_VIEW);
    let user = match enforce(&state, &access, &uri, requirement) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let can_create_project = CapabilityGuard::manager_only()
        .with_permission(Permission::PROJECTS_MANAGE)
        .render_or(&access, || true, || false);
    HtmlTemplate(ProjectsTemplate::new(&user, can_create_project)).into_response()
}

/// Resource management for one project; project-scoped overrides apply
pub async fn project_resources_page(
    State(state): State<AppState>,
    CurrentAccess(access): CurrentAccess,
    Path(project_id): Path<String>,
    uri: Uri,
) -> Response {
    let requirement = RouteRequirement::authenticated()
        .role(Role::Manager)
        .permission(Permission::RESOURCES_MANAGE)
        .resource(project_id.as_str());
    match enforce(&state, &access, &uri, requirement) {
        Ok(user) => HtmlTemplate(ResourcesTemplate::new(&user, project_id)).into_response(),
        Err(response) => response,
    }
}

pub async fn settings_page(
    State(state): State<AppState>,
    CurrentAccess(access): CurrentAccess,
    uri: Uri,
) -> Response {
    let requirement = RouteRequirement::authenticated().role(Role::Admin);
    match enforce(&state, &access, &uri, requirement) {
        Ok(user) => HtmlTemplate(SettingsTemplate::new(&user)).into_response(),
        Err(response) => response,
    }
}

pub async fn billing_page(
    State(state): State<AppState>,
    CurrentAccess(access): CurrentAccess,
    uri: Uri,
) -> Response {
    let requirement = RouteRequirement::authenticated().permission(Permission::WORKSPACE_BILLING);
    match enforce(&state, &access, &uri, requirement) {
        Ok(user) => HtmlTemplate(BillingTemplate::new(&user)).into_response(),
        Err(response) => response,
    }
}

/// Platform administration; checks the system-wide role
pub async fn system_admin_page(
    State(state): State<AppState>,
    CurrentAccess(access): CurrentAccess,
    uri: Uri,
) -> Response {
    let options = RequireAuthOptions::default().role(Role::Admin);
    match require_auth(&state, &access, &uri, options) {
        Ok(user) => HtmlTemplate(SystemAdminTemplate::new(&user)).into_response(),
        Err(response) => response,
    }
}
