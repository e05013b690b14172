//! Request and response bodies of the JSON API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use trellis_access::{
    AccessError, SessionPhase, SessionSnapshot, SessionTimeoutConfig, SessionTimeoutWarning,
    SignOutConfirmDialog, SignOutOutcome,
};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub active_sessions: usize,
}

/// Idle-warning dialog as the client should render it
#[derive(Debug, Serialize)]
pub struct WarningDialogResponse {
    pub open: bool,
    pub remaining_label: String,
    pub extend_label: &'static str,
    pub sign_out_label: &'static str,
}

impl From<SessionTimeoutWarning> for WarningDialogResponse {
    fn from(warning: SessionTimeoutWarning) -> Self {
        Self {
            open: warning.open,
            remaining_label: warning.remaining_label(),
            extend_label: SessionTimeoutWarning::EXTEND_LABEL,
            sign_out_label: SessionTimeoutWarning::SIGN_OUT_LABEL,
        }
    }
}

/// Current idle-session state of the caller
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub phase: SessionPhase,
    pub warning_active: bool,
    pub expired: bool,
    /// Whole seconds left in the warning countdown
    pub remaining_secs: u64,
    pub last_activity_at: chrono::DateTime<chrono::Utc>,
    pub idle_timeout_secs: u64,
    pub warning_secs: u64,
    pub warning_dialog: WarningDialogResponse,
}

impl SessionResponse {
    pub fn new(snapshot: &SessionSnapshot, config: &SessionTimeoutConfig) -> Self {
        Self {
            session_id: snapshot.session_id.clone(),
            phase: snapshot.phase,
            warning_active: snapshot.warning_active,
            expired: snapshot.expired,
            remaining_secs: snapshot.remaining_secs(),
            last_activity_at: snapshot.last_activity_at,
            idle_timeout_secs: config.idle_timeout.as_secs(),
            warning_secs: config.warning_lead.as_secs(),
            warning_dialog: SessionTimeoutWarning::from_snapshot(snapshot).into(),
        }
    }
}

/// Sign-in request query
#[derive(Debug, Default, Deserialize)]
pub struct SignInQuery {
    #[serde(rename = "returnTo")]
    pub return_to: Option<String>,
}

/// Response of a successful sign-in
#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub user_id: String,
    /// Where the client should navigate next
    pub redirect: String,
    pub session: SessionResponse,
}

/// One dialog button
#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub label: &'static str,
    pub disabled: bool,
}

/// Sign-out confirmation dialog state
#[derive(Debug, Serialize)]
pub struct SignOutDialogResponse {
    pub open: bool,
    pub is_loading: bool,
    pub cancel: ControlResponse,
    pub confirm: ControlResponse,
}

impl From<SignOutConfirmDialog> for SignOutDialogResponse {
    fn from(dialog: SignOutConfirmDialog) -> Self {
        let cancel = dialog.cancel_control();
        let confirm = dialog.confirm_control();
        Self {
            open: dialog.open,
            is_loading: dialog.is_loading,
            cancel: ControlResponse {
                label: cancel.label,
                disabled: cancel.disabled,
            },
            confirm: ControlResponse {
                label: confirm.label,
                disabled: confirm.disabled,
            },
        }
    }
}

/// Outcome of confirming the sign-out dialog
#[derive(Debug, Serialize)]
pub struct SignOutResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    pub dialog: SignOutDialogResponse,
}

impl SignOutResponse {
    pub fn new(outcome: SignOutOutcome, auth_route: &str, dialog: SignOutConfirmDialog) -> Self {
        let (outcome, message, redirect) = match outcome {
            SignOutOutcome::SignedOut => ("signed_out", None, Some(auth_route.to_string())),
            SignOutOutcome::Failed { message } => ("failed", Some(message), None),
            SignOutOutcome::AlreadyInProgress => ("in_progress", None, None),
            SignOutOutcome::NotRequested => ("not_requested", None, None),
        };
        Self {
            outcome,
            message,
            redirect,
            dialog: dialog.into(),
        }
    }
}

/// Error body shared by all API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

/// API error with its HTTP status
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, error: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: error.to_string(),
                message: message.into(),
                redirect: None,
            },
        }
    }

    /// No signed-in user; the client should go to `auth_route`
    pub fn unauthorized(auth_route: &str) -> Self {
        let mut error = Self::new(StatusCode::UNAUTHORIZED, "unauthenticated", "Sign in required");
        error.body.redirect = Some(auth_route.to_string());
        error
    }

    pub fn session_ended(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "session_ended", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<AccessError> for ApiError {
    fn from(error: AccessError) -> Self {
        match error {
            AccessError::Session { message } => Self::session_ended(message),
            AccessError::Permission { message } => {
                Self::new(StatusCode::FORBIDDEN, "permission_denied", message)
            }
            other => Self::internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
