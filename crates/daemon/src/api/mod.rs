pub mod middleware;
pub mod process_handlers;
pub mod ws;

use crate::supervisor::Supervisor;
use axum::middleware as axum_middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(supervisor: Arc<Supervisor>) -> Router {
    Router::new()
        .route("/api/v1/compile", post(process_handlers::compile_handler))
        .route(
            "/api/v1/processes",
            post(process_handlers::create_process_handler).get(process_handlers::list_processes_handler),
        )
        .route("/api/v1/processes/:pid/input", post(process_handlers::input_handler))
        .route("/api/v1/processes/:pid", delete(process_handlers::kill_handler))
        .route("/events", get(ws::events_handler))
        .with_state(supervisor)
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
