use super::AppState;
use crate::api::models::data::{DataQuery, DataResponse, DEFAULT_INTERVAL, DEFAULT_RANGE};
use crate::error::{ApiError, Result};
use axum::{
    extract::{Query, State},
    Json,
};
use room_sensors::TimeToken;

/// Per-room temperature, pressure and humidity series for the chart.
///
/// The query string is taken as raw pairs so malformed input is reported
/// with the same error body as an invalid token.
pub async fn get_data(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<DataResponse>> {
    let params = DataQuery::from_pairs(pairs).map_err(ApiError::InvalidParameter)?;
    let range = parse_token("range", params.range.as_deref(), DEFAULT_RANGE)?;
    let interval = parse_token("interval", params.interval.as_deref(), DEFAULT_INTERVAL)?;

    let data = state.gateway.query(range, interval).await?;
    Ok(Json(DataResponse { data }))
}

/// Parse an optional token parameter; absent or empty means `default`.
fn parse_token(name: &'static str, value: Option<&str>, default: &str) -> Result<TimeToken> {
    let raw = match value {
        Some(v) if !v.is_empty() => v,
        _ => default,
    };
    raw.parse().map_err(|_| ApiError::InvalidParameter(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_defaults() {
        assert_eq!(parse_token("range", None, "30m").unwrap().to_string(), "30m");
        assert_eq!(parse_token("range", Some(""), "30m").unwrap().to_string(), "30m");
        assert_eq!(parse_token("range", Some("2h"), "30m").unwrap().to_string(), "2h");
    }

    #[test]
    fn test_parse_token_rejects() {
        for bad in ["abc", "100m", "5", "5w", " 5m", "5m;DROP TABLE room_sensors"] {
            match parse_token("interval", Some(bad), "15s") {
                Err(ApiError::InvalidParameter(name)) => assert_eq!(name, "interval"),
                other => panic!("{bad:?} gave {other:?}"),
            }
        }
    }
}
