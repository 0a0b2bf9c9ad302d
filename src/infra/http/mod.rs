pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

pub use state::ApiState;

use axum::{Router, middleware as axum_middleware, routing::get};

use self::middleware::log_responses;

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/images", get(handlers::list_images))
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
}
