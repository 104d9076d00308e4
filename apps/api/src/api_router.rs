use axum::Router;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route(
            "/projects/{project_id}/instances/{instance_id}/backups",
            post(handlers::backups::create_backup_handler)
                .delete(handlers::backups::prune_backups_handler),
        )
        .route(
            "/projects/{project_id}/instances/{instance_id}/backups/{backup_id}",
            get(handlers::backups::get_backup_status_handler),
        )
        .fallback(handlers::fallback::unmatched_request_handler)
        .method_not_allowed_fallback(handlers::fallback::unmatched_request_handler)
        .layer(from_fn(middleware::request_context))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

#[cfg(test)]
mod tests;
