//! Request identity and route protection for axum handlers
//!
//! Identity arrives in trusted `x-user-*` headers set by the upstream
//! gateway. Handlers pull it out with the extractors below and run the
//! access guards against it.

use crate::handlers::types::ApiError;
use crate::AppState;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::RETRY_AFTER, request::Parts, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Mutex;
use tracing::{debug, warn};
use trellis_access::{
    AccessContext, GuardDecision, RequireAuth, RequireAuthOptions, RouteGuard, RouteRequirement,
    UserIdentity,
};
use trellis_core::{Location, NavigateOptions, Navigator};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const SYSTEM_ROLE_HEADER: &str = "x-system-role";

/// Identity of the caller, possibly anonymous
#[derive(Debug, Clone)]
pub struct CurrentAccess(pub AccessContext);

impl<S> FromRequestParts<S> for CurrentAccess
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        Ok(CurrentAccess(app_state.resolve_context(&parts.headers)))
    }
}

/// Signed-in caller; API requests without one are rejected with 401
#[derive(Debug, Clone)]
pub struct SessionUser(pub UserIdentity);

impl<S> FromRequestParts<S> for SessionUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        match app_state.resolve_context(&parts.headers).identity {
            Some(identity) => Ok(SessionUser(identity)),
            None => {
                debug!(path = %parts.uri.path(), "Rejecting anonymous API request");
                Err(ApiError::unauthorized(&app_state.routes().auth_route))
            }
        }
    }
}

/// Location of a request as the guards see it
pub fn request_location(uri: &Uri) -> Location {
    uri.path_and_query()
        .map(|pq| Location::parse(pq.as_str()))
        .unwrap_or_else(|| Location::parse(uri.path()))
}

/// Placeholder response while identity is still resolving
fn loading_response() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        [(RETRY_AFTER, "1")],
        "Loading...",
    )
        .into_response()
}

/// Run the route guard for a page request.
///
/// On `Allow` the user's idle session is started if needed and the page view
/// counts as activity. Every other decision becomes the response to send.
pub fn enforce(
    state: &AppState,
    access: &AccessContext,
    uri: &Uri,
    requirement: RouteRequirement,
) -> Result<UserIdentity, Response> {
    let location = request_location(uri);
    let decision = RouteGuard::new(requirement).evaluate(access, &location);

    match decision {
        GuardDecision::Allow => {
            let identity = access.identity.clone().ok_or_else(loading_response)?;
            touch_session(state, &identity.user_id);
            Ok(identity)
        }
        GuardDecision::Loading => Err(loading_response()),
        redirect => match redirect.redirect_target(state.routes()) {
            Some(target) => Err(Redirect::temporary(&target).into_response()),
            None => Err(loading_response()),
        },
    }
}

/// Start the user's session on first use and record a page view as activity
pub fn touch_session(state: &AppState, user_id: &str) {
    let result = state
        .sessions
        .ensure(user_id)
        .and_then(|_| state.sessions.with_session(user_id, |handle| handle.record_activity()));
    if let Err(error) = result {
        warn!(user_id = %user_id, error = %error, "Could not record session activity");
    }
}

/// Navigator that turns the last navigation into an HTTP redirect
#[derive(Debug)]
pub struct RedirectNavigator {
    location: Location,
    target: Mutex<Option<String>>,
}

impl RedirectNavigator {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            target: Mutex::new(None),
        }
    }

    pub fn for_uri(uri: &Uri) -> Self {
        Self::new(request_location(uri))
    }

    /// Redirect for the last navigation, if any happened
    pub fn into_redirect(self) -> Option<Redirect> {
        self.target
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .map(|target| Redirect::temporary(&target))
    }
}

impl Navigator for RedirectNavigator {
    fn navigate(&self, path: &str, _options: NavigateOptions) {
        *self
            .target
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(path.to_string());
    }

    fn location(&self) -> Location {
        self.location.clone()
    }
}

/// Run the `RequireAuth` hook for a page, checking system-wide roles
pub fn require_auth(
    state: &AppState,
    access: &AccessContext,
    uri: &Uri,
    options: RequireAuthOptions,
) -> Result<UserIdentity, Response> {
    let navigator = RedirectNavigator::for_uri(uri);
    let status = RequireAuth::new(options, state.routes().clone()).sync(access, &navigator);

    if let Some(redirect) = navigator.into_redirect() {
        return Err(redirect.into_response());
    }
    match status.user {
        Some(identity) if status.is_authorized => {
            touch_session(state, &identity.user_id);
            Ok(identity)
        }
        _ => Err(loading_response()),
    }
}
