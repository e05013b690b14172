//! Application state shared by all handlers

use crate::{config_loader::ConfigLoader, sessions::SessionRegistry, WebConfig, WebError, WebResult};
use axum::http::HeaderMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use trellis_access::{AccessConfig, AccessContext};
use trellis_core::{RouteSettings, TrellisConfig};

/// Headers the identity extractor reads
const IDENTITY_HEADERS: [&str; 6] = [
    "x-user-id",
    "x-user-role",
    "x-system-role",
    "x-user-name",
    "x-user-email",
    "x-workspace-id",
];

/// Page paths served regardless of the route configuration
const FIXED_PAGES: [&str; 4] = ["/projects", "/settings", "/billing", "/admin/system"];

#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration
    pub config: WebConfig,
    /// Loaded Trellis configuration
    pub settings: Arc<TrellisConfig>,
    /// Guard routes and idle-timeout parameters
    pub access: Arc<AccessConfig>,
    /// Running idle-session timeouts
    pub sessions: SessionRegistry,
}

impl AppState {
    /// Create state from the layered configuration sources
    pub fn new(config: WebConfig) -> WebResult<Self> {
        let mut loader = ConfigLoader::new();
        if let Some(path) = &config.config_path {
            loader = loader.with_config_file(path);
        }
        let settings = loader
            .load()
            .map_err(|e| WebError::Config(format!("{:#}", e)))?;
        Self::with_settings(config, settings)
    }

    /// Create state from an already loaded configuration
    pub fn with_settings(config: WebConfig, settings: TrellisConfig) -> WebResult<Self> {
        let access = AccessConfig::try_from(&settings)?;
        for route in [
            &access.routes.auth_route,
            &access.routes.unauthorized_route,
            &access.routes.default_landing_route,
        ] {
            if FIXED_PAGES.contains(&route.as_str()) || route.starts_with("/api") {
                return Err(WebError::Config(format!(
                    "Route '{}' collides with a built-in page",
                    route
                )));
            }
        }
        info!(
            idle_timeout_secs = access.session.idle_timeout.as_secs(),
            warning_lead_secs = access.session.warning_lead.as_secs(),
            auth_route = %access.routes.auth_route,
            "Access layer configured"
        );

        Ok(Self {
            sessions: SessionRegistry::new(access.session),
            access: Arc::new(access),
            settings: Arc::new(settings),
            config,
        })
    }

    pub fn routes(&self) -> &RouteSettings {
        &self.access.routes
    }

    /// Identity claimed by the request headers, ignoring sign-out state
    pub fn header_context(&self, headers: &HeaderMap) -> AccessContext {
        let values: HashMap<String, String> = IDENTITY_HEADERS
            .iter()
            .filter_map(|name| {
                headers
                    .get(*name)
                    .and_then(|value| value.to_str().ok())
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect();
        AccessContext::from_headers(&values)
    }

    /// Resolve the caller's identity from request headers.
    ///
    /// Users who have been signed out, by hand or by the idle timeout, are
    /// anonymous until they sign in again.
    pub fn resolve_context(&self, headers: &HeaderMap) -> AccessContext {
        let context = self.header_context(headers);
        match context.user_id() {
            Some(user_id) if self.sessions.is_signed_out(user_id) => {
                debug!(user_id = %user_id, "Ignoring identity of signed-out user");
                AccessContext::anonymous()
            }
            _ => context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use trellis_access::Role;
    use trellis_core::SignOutService;

    fn state() -> AppState {
        AppState::with_settings(WebConfig::default(), TrellisConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = TrellisConfig::default();
        settings.session.warning_minutes = 30;
        assert!(AppState::with_settings(WebConfig::default(), settings).is_err());

        let mut settings = TrellisConfig::default();
        settings.routes.default_landing_route = "/projects".to_string();
        assert!(AppState::with_settings(WebConfig::default(), settings).is_err());
    }

    #[test]
    fn test_oversized_idle_timeout_fails_startup() {
        let mut settings = TrellisConfig::default();
        settings.session.idle_timeout_minutes = u64::MAX / 2;
        assert!(matches!(
            AppState::with_settings(WebConfig::default(), settings),
            Err(WebError::Access(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_context_from_headers() {
        let state = state();
        let mut headers = HeaderMap::new();
        assert!(state.resolve_context(&headers).is_anonymous());

        headers.insert("x-user-id", HeaderValue::from_static("dana"));
        headers.insert("x-user-role", HeaderValue::from_static("manager"));
        let context = state.resolve_context(&headers);
        assert_eq!(context.user_id(), Some("dana"));
        assert_eq!(
            context.identity.as_ref().and_then(|identity| identity.role),
            Some(Role::Manager)
        );
    }

    #[tokio::test]
    async fn test_signed_out_user_is_anonymous() {
        let state = state();
        state.sessions.sign_in("dana");
        state
            .sessions
            .sign_out_service("dana")
            .sign_out()
            .await
            .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("dana"));
        assert!(state.resolve_context(&headers).is_anonymous());
    }
}
