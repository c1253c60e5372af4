//! Dashboard statistics endpoint.

use audit_common::AppResult;
use audit_core::DashboardStats;
use axum::{Router, extract::State, routing::post};

use crate::{extractors::AuthCaller, middleware::AppState, response::ApiResponse};

/// Survey and audit counts visible to the caller.
async fn stats(
    AuthCaller(caller): AuthCaller,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<DashboardStats>> {
    let stats = state.report_service.stats(&caller).await?;
    Ok(ApiResponse::ok(stats))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(stats))
}
