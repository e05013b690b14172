//! Server-rendered pages
//!
//! Askama escapes every interpolated value, so header-supplied names and
//! path segments can be passed in as-is.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::error;
use trellis_access::UserIdentity;

/// Sign-in page
#[derive(Template)]
#[template(path = "sign_in.html")]
pub struct SignInTemplate {
    pub title: &'static str,
}

/// Shown when the caller lacks the role or permission for a page
#[derive(Template)]
#[template(path = "access_denied.html")]
pub struct AccessDeniedTemplate {
    pub title: &'static str,
}

/// Landing page
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub title: &'static str,
    pub user: String,
    pub show_settings_link: bool,
}

#[derive(Template)]
#[template(path = "projects.html")]
pub struct ProjectsTemplate {
    pub title: &'static str,
    pub user: String,
    pub can_create_project: bool,
}

/// Resource management for one project
#[derive(Template)]
#[template(path = "resources.html")]
pub struct ResourcesTemplate {
    pub title: &'static str,
    pub user: String,
    pub project_id: String,
}

#[derive(Template)]
#[template(path = "settings.html")]
pub struct SettingsTemplate {
    pub title: &'static str,
    pub user: String,
}

#[derive(Template)]
#[template(path = "billing.html")]
pub struct BillingTemplate {
    pub title: &'static str,
    pub user: String,
}

#[derive(Template)]
#[template(path = "system_admin.html")]
pub struct SystemAdminTemplate {
    pub title: &'static str,
    pub user: String,
}

impl SignInTemplate {
    pub fn new() -> Self {
        Self { title: "Sign in" }
    }
}

impl Default for SignInTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessDeniedTemplate {
    pub fn new() -> Self {
        Self {
            title: "Access denied",
        }
    }
}

impl Default for AccessDeniedTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardTemplate {
    pub fn new(user: &UserIdentity, show_settings_link: bool) -> Self {
        Self {
            title: "Dashboard",
            user: user.display_string(),
            show_settings_link,
        }
    }
}

impl ProjectsTemplate {
    pub fn new(user: &UserIdentity, can_create_project: bool) -> Self {
        Self {
            title: "Projects",
            user: user.display_string(),
            can_create_project,
        }
    }
}

impl ResourcesTemplate {
    pub fn new(user: &UserIdentity, project_id: String) -> Self {
        Self {
            title: "Resources",
            user: user.display_string(),
            project_id,
        }
    }
}

impl SettingsTemplate {
    pub fn new(user: &UserIdentity) -> Self {
        Self {
            title: "Workspace settings",
            user: user.display_string(),
        }
    }
}

impl BillingTemplate {
    pub fn new(user: &UserIdentity) -> Self {
        Self {
            title: "Billing",
            user: user.display_string(),
        }
    }
}

impl SystemAdminTemplate {
    pub fn new(user: &UserIdentity) -> Self {
        Self {
            title: "System administration",
            user: user.display_string(),
        }
    }
}

/// Renders a template as an HTML response
pub struct HtmlTemplate<T>(pub T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(e) => {
                error!(error = %e, "Failed to render page");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
            }
        }
    }
}
