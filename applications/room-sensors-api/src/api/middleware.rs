use crate::api::handlers::AppState;
use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

/// Reject requests whose identity is not on the allow-list, before any
/// handler work. The identity is passed on as a request extension.
pub async fn require_allowed(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = state
        .auth
        .authorize(request.headers())
        .ok_or(ApiError::Forbidden)?;
    debug!(email = %identity.email, "request authorized");
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
