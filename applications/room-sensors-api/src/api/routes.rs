use crate::api::handlers::{auth, data, health, index, AppState};
use crate::api::middleware::require_allowed;
use axum::{extract::Request, middleware, routing::get, Router};
use std::path::Path;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::Level;

pub fn create_router(state: AppState, assets_dir: impl AsRef<Path>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/", get(index::get_index))
        .route("/auth/callback", get(auth::callback))
        .route("/auth/logout", get(auth::logout));

    // Allow-listed users only. Layered on the method router so unsupported
    // methods still answer 405 before any identity check.
    let data_routes = Router::new().route(
        "/data.json",
        get(data::get_data)
            .route_layer(middleware::from_fn_with_state(state.clone(), require_allowed)),
    );

    Router::new()
        .merge(public_routes)
        .merge(data_routes)
        .nest_service("/assets", ServeDir::new(assets_dir.as_ref()))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    tracing::span!(
                        Level::INFO,
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri().path(),
                    )
                })
                .on_request(|_request: &Request, _span: &tracing::Span| {
                    tracing::event!(Level::DEBUG, "received request");
                })
                .on_response(
                    |response: &axum::response::Response,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::event!(
                            Level::INFO,
                            status = response.status().as_u16(),
                            latency = ?latency,
                            "request completed"
                        );
                    },
                )
                .on_failure(
                    |_error: tower_http::classify::ServerErrorsFailureClass,
                     _latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::event!(Level::ERROR, "request failed");
                    },
                ),
        )
}
