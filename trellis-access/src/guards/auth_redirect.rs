//! Post-authentication redirect
//!
//! Once a user is signed in while sitting on the auth route, send them back
//! to where they were going.

use crate::auth::IdentityStore;
use tracing::{debug, warn};
use trellis_core::{Location, NavigateOptions, Navigator, RouteSettings};

/// Where to send an authenticated user who is on the auth route.
///
/// Uses the decoded `returnTo` parameter unless it is missing, points back
/// at the auth route, or is not a same-origin relative path.
pub fn post_auth_redirect_target(location: &Location, routes: &RouteSettings) -> String {
    match location.query_param("returnTo") {
        Some(target) if is_acceptable_return(&target, routes) => target,
        Some(target) => {
            debug!(return_to = %target, "Ignoring returnTo");
            routes.default_landing_route.clone()
        }
        None => routes.default_landing_route.clone(),
    }
}

fn is_acceptable_return(target: &str, routes: &RouteSettings) -> bool {
    if !target.starts_with('/') || target.starts_with("//") || target.contains('\\') {
        warn!(return_to = %target, "Rejected off-site returnTo");
        return false;
    }

    Location::parse(target).pathname != routes.auth_route
}

/// Navigate an authenticated user away from the auth route.
///
/// Does nothing while loading, without a user, or off the auth route.
/// Returns the navigation target when a redirect happened.
pub fn redirect_authenticated_away<S, N>(
    store: &S,
    navigator: &N,
    routes: &RouteSettings,
) -> Option<String>
where
    S: IdentityStore + ?Sized,
    N: Navigator + ?Sized,
{
    if store.is_loading() || store.current_user().is_none() {
        return None;
    }

    let location = navigator.location();
    if location.pathname != routes.auth_route {
        return None;
    }

    let target = post_auth_redirect_target(&location, routes);
    navigator.navigate(&target, NavigateOptions::replace());
    Some(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{InMemoryIdentityStore, Role, UserIdentity};
    use crate::guards::test_support::RecordingNavigator;

    fn target(path: &str) -> String {
        post_auth_redirect_target(&Location::parse(path), &RouteSettings::default())
    }

    #[test]
    fn test_return_to_is_followed() {
        assert_eq!(target("/auth?returnTo=%2Fprojects%3Fx%3D1"), "/projects?x=1");
    }

    #[test]
    fn test_return_to_auth_goes_to_dashboard() {
        assert_eq!(target("/auth?returnTo=/auth"), "/dashboard");
        assert_eq!(target("/auth?returnTo=%2Fauth%3FreturnTo%3D%252Fx"), "/dashboard");
        assert_eq!(target("/auth"), "/dashboard");
    }

    #[test]
    fn test_off_site_return_to_is_rejected() {
        assert_eq!(target("/auth?returnTo=https%3A%2F%2Fevil.example"), "/dashboard");
        assert_eq!(target("/auth?returnTo=%2F%2Fevil.example"), "/dashboard");
        assert_eq!(target("/auth?returnTo=%2F%5Cevil.example"), "/dashboard");
    }

    #[test]
    fn test_redirect_waits_for_loading() {
        let store = InMemoryIdentityStore::new();
        let navigator = RecordingNavigator::at("/auth?returnTo=%2Fprojects");
        let routes = RouteSettings::default();

        assert_eq!(redirect_authenticated_away(&store, &navigator, &routes), None);

        store.resolve(Some(UserIdentity::new("u-1").with_role(Role::Member)));
        assert_eq!(
            redirect_authenticated_away(&store, &navigator, &routes).as_deref(),
            Some("/projects")
        );
        assert_eq!(navigator.calls(), vec![("/projects".to_string(), true)]);
    }

    #[test]
    fn test_no_redirect_off_auth_route_or_signed_out() {
        let routes = RouteSettings::default();
        let signed_in = InMemoryIdentityStore::with_user(UserIdentity::new("u-1"));
        let elsewhere = RecordingNavigator::at("/projects");
        assert_eq!(redirect_authenticated_away(&signed_in, &elsewhere, &routes), None);

        let signed_out = InMemoryIdentityStore::signed_out();
        let on_auth = RecordingNavigator::at("/auth");
        assert_eq!(redirect_authenticated_away(&signed_out, &on_auth, &routes), None);
        assert!(on_auth.calls().is_empty());
    }
}
