//! Axum router configuration with middleware.
//!
//! The webhook and status routes sit at the root because the messaging
//! platform is configured with fixed URLs; everything else is under
//! `/api/v1/`. Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/messages", post(handlers::messages::send_message))
        .route(
            "/conversations/{user_id}",
            get(handlers::conversations::get_conversation),
        )
        .route(
            "/conversations/{user_id}/clear",
            post(handlers::conversations::clear_conversation),
        );

    Router::new()
        .route("/", get(handlers::status::service_status))
        .route("/health", get(handlers::status::health_check))
        .route(
            "/webhook",
            get(handlers::webhook::verify_webhook).post(handlers::webhook::receive_webhook),
        )
        .nest("/api/v1", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
