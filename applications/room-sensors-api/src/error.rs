use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use room_sensors::TelemetryError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("forbidden")]
    Forbidden,

    #[error("{0} is not valid")]
    InvalidParameter(&'static str),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("Store error: {0}")]
    Store(#[from] TelemetryError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) | ApiError::Store(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Forbidden => "forbidden".to_string(),
            ApiError::InvalidParameter(name) => format!("{} is not valid", name),
            ApiError::Authentication(ref reason) => {
                tracing::warn!("Authentication failed: {}", reason);
                "Authentication failed".to_string()
            }
            ApiError::Store(ref e) => {
                tracing::error!("Store error: {:?}", e);
                "Internal Server Error".to_string()
            }
            ApiError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal Server Error".to_string()
            }
        };

        let body = Json(json!({
            "code": status.as_u16(),
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_of(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_bad_parameter_names_the_parameter() {
        let (status, body) = body_of(ApiError::InvalidParameter("interval")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"code": 400, "message": "interval is not valid"}));
    }

    #[tokio::test]
    async fn test_store_error_is_not_leaked() {
        let err = ApiError::Store(TelemetryError::Store("connection reset by peer".into()));
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"code": 500, "message": "Internal Server Error"}));
    }

    #[tokio::test]
    async fn test_forbidden() {
        let (status, body) = body_of(ApiError::Forbidden).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, json!({"code": 403, "message": "forbidden"}));
    }
}
