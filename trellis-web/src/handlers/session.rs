//! Session lifecycle endpoints
//!
//! The client reports activity and answers the warning dialog here; the
//! server-side runtime owns the timers and performs the forced sign-out.

use super::types::{
    ApiError, SessionResponse, SignInQuery, SignInResponse, SignOutDialogResponse,
    SignOutResponse,
};
use crate::auth::SessionUser;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Json,
};
use tracing::{debug, info};
use trellis_access::{
    post_auth_redirect_target, AccessResult, SessionSnapshot, SessionTimeoutHandle,
};
use trellis_core::performance::measure_async;
use trellis_core::{with_timeout, Location};

/// How long a command response waits for the runtime to publish
const COMMAND_ACK_TIMEOUT_MS: u64 = 250;

fn session_response(state: &AppState, snapshot: &SessionSnapshot) -> Json<SessionResponse> {
    Json(SessionResponse::new(snapshot, state.sessions.config()))
}

/// Activity and extend both restart the idle clock
fn clock_reset(before: &SessionSnapshot, current: &SessionSnapshot) -> bool {
    current.expired || current.last_activity_at != before.last_activity_at
}

/// Sign-out-now only acts during the warning
fn warning_closed(_before: &SessionSnapshot, current: &SessionSnapshot) -> bool {
    current.expired || !current.warning_active
}

/// Send a command to the caller's session and return the first state that
/// reflects it. Countdown ticks published in between are skipped.
async fn apply_command(
    state: &AppState,
    user_id: &str,
    command: impl FnOnce(&SessionTimeoutHandle) -> AccessResult<()>,
    applied: fn(&SessionSnapshot, &SessionSnapshot) -> bool,
) -> Result<SessionSnapshot, ApiError> {
    state.sessions.ensure(user_id)?;
    let mut rx = state
        .sessions
        .subscribe(user_id)
        .ok_or_else(|| ApiError::session_ended(format!("No active session for {}", user_id)))?;
    let before = rx.borrow_and_update().clone();

    state.sessions.with_session(user_id, command)?;

    // A closed channel means the session just ended and the last value is final
    let wait = async {
        rx.wait_for(|current| applied(&before, current))
            .await
            .map(|snapshot| snapshot.clone())
    };
    match with_timeout(wait, COMMAND_ACK_TIMEOUT_MS, "session_command").await {
        Ok(Ok(snapshot)) => Ok(snapshot),
        Ok(Err(_)) => Ok(rx.borrow().clone()),
        Err(_) => {
            debug!(user_id = %user_id, "Session command not acknowledged in time");
            Ok(rx.borrow().clone())
        }
    }
}

/// Current idle-session state, starting the session on first call
pub async fn get_session(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
) -> Result<Json<SessionResponse>, ApiError> {
    let snapshot = state.sessions.ensure(&user.user_id)?;
    Ok(session_response(&state, &snapshot))
}

/// Tracked user interaction
pub async fn record_activity(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
) -> Result<Json<SessionResponse>, ApiError> {
    let snapshot = apply_command(
        &state,
        &user.user_id,
        |handle| handle.record_activity(),
        clock_reset,
    )
    .await?;
    Ok(session_response(&state, &snapshot))
}

/// "Stay Signed In" from the warning dialog
pub async fn extend_session(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
) -> Result<Json<SessionResponse>, ApiError> {
    let snapshot =
        apply_command(&state, &user.user_id, |handle| handle.extend(), clock_reset).await?;
    Ok(session_response(&state, &snapshot))
}

/// "Sign Out Now" from the warning dialog
pub async fn sign_out_now(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
) -> Result<Json<SessionResponse>, ApiError> {
    let snapshot =
        apply_command(&state, &user.user_id, |handle| handle.sign_out_now(), warning_closed).await?;
    Ok(session_response(&state, &snapshot))
}

/// Start a fresh authenticated session for the identity in the headers
pub async fn sign_in(
    State(state): State<AppState>,
    Query(query): Query<SignInQuery>,
    headers: HeaderMap,
) -> Result<Json<SignInResponse>, ApiError> {
    let access = state.header_context(&headers);
    let user_id = access
        .user_id()
        .ok_or_else(|| ApiError::unauthorized(&state.routes().auth_route))?
        .to_string();

    let snapshot = state.sessions.sign_in(&user_id);
    let search = query
        .return_to
        .map(|target| format!("?returnTo={}", urlencoding::encode(&target)))
        .unwrap_or_default();
    let location = Location::new(state.routes().auth_route.clone(), search);
    let redirect = post_auth_redirect_target(&location, state.routes());
    info!(user_id = %user_id, redirect = %redirect, "Sign-in accepted");

    Ok(Json(SignInResponse {
        user_id,
        redirect,
        session: SessionResponse::new(&snapshot, state.sessions.config()),
    }))
}

/// Sign-out confirmation dialog state
pub async fn sign_out_dialog(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
) -> Json<SignOutDialogResponse> {
    Json(state.sessions.sign_out_flow(&user.user_id).dialog().into())
}

/// Open the sign-out confirmation
pub async fn request_sign_out(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
) -> Json<SignOutDialogResponse> {
    let flow = state.sessions.sign_out_flow(&user.user_id);
    flow.request();
    Json(flow.dialog().into())
}

/// Close the sign-out confirmation; ignored while signing out
pub async fn cancel_sign_out(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
) -> Json<SignOutDialogResponse> {
    let flow = state.sessions.sign_out_flow(&user.user_id);
    flow.cancel();
    Json(flow.dialog().into())
}

/// Confirm the dialog and sign out
pub async fn confirm_sign_out(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
) -> Json<SignOutResponse> {
    let flow = state.sessions.sign_out_flow(&user.user_id);
    let service = state.sessions.sign_out_service(&user.user_id);
    let outcome = measure_async("sign_out", flow.confirm(service.as_ref())).await;
    debug!(user_id = %user.user_id, outcome = ?outcome, "Sign-out confirmed");

    Json(SignOutResponse::new(
        outcome,
        &state.routes().auth_route,
        flow.dialog(),
    ))
}
