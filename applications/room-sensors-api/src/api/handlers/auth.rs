use super::AppState;
use crate::auth::forwarded_email;
use crate::error::{ApiError, Result};
use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use tracing::{info, warn};

/// Landing point after the proxy login: start a session for the forwarded
/// email and go to the chart page. Emails off the allow-list get no session.
pub async fn callback(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    let email = forwarded_email(&headers)
        .ok_or_else(|| ApiError::Authentication("no X-Auth-Request-Email on callback".into()))?;

    if !state.auth.allow_list().is_allowed(Some(email)) {
        warn!(email = %email, "login refused, not on the allow-list");
        return Err(ApiError::Forbidden);
    }

    let cookie = state
        .sessions
        .issue_cookie(email)
        .map_err(|e| ApiError::Authentication(format!("signing session: {}", e)))?;
    info!(email = %email, "session started");
    Ok(([(header::SET_COOKIE, cookie)], Redirect::temporary("/")).into_response())
}

pub async fn logout(State(state): State<AppState>) -> Response {
    (
        [(header::SET_COOKIE, state.sessions.clear_cookie())],
        Redirect::temporary("/"),
    )
        .into_response()
}
