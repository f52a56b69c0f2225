use super::AppState;
use crate::error::{ApiError, Result};
use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};

/// The chart page for allowed users; everyone else goes to the login.
pub async fn get_index(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    if state.auth.authorize(&headers).is_none() {
        return Ok(Redirect::temporary(&state.site.login_url()).into_response());
    }

    let body = tokio::fs::read(&state.site.index_file).await.map_err(|e| {
        ApiError::Internal(format!(
            "reading index file {}: {}",
            state.site.index_file.display(),
            e
        ))
    })?;
    Ok(([(header::CONTENT_TYPE, "text/html; charset=utf-8")], body).into_response())
}
