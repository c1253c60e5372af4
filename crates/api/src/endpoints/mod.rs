//! API endpoints.

mod audits;
mod files;
mod stats;
mod surveys;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/surveys", surveys::router())
        .nest("/audits", audits::router())
        .nest("/files", files::router())
        .nest("/stats", stats::router())
}
