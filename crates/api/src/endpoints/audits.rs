//! Audit endpoints.

use audit_common::AppResult;
use audit_core::statistics::AuditReport;
use audit_core::{
    AuditListEntry, AuditView, CreateAuditInput, FeedbackInput, ListAuditsInput, UpdateAuditInput,
};
use audit_db::entities::audit;
use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthCaller, middleware::AppState, response::ApiResponse};

/// Request naming one audit.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditIdRequest {
    pub audit_id: String,
}

/// Request to update an audit.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAuditRequest {
    pub audit_id: String,
    #[serde(flatten)]
    pub input: UpdateAuditInput,
}

/// Request to update an audit's feedback.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub audit_id: String,
    #[serde(flatten)]
    pub input: FeedbackInput,
}

/// A written audit.
#[derive(Debug, Serialize)]
pub struct AuditResponse {
    pub audit: audit::Model,
}

/// Start an audit.
async fn create_audit(
    AuthCaller(caller): AuthCaller,
    State(state): State<AppState>,
    Json(input): Json<CreateAuditInput>,
) -> AppResult<ApiResponse<AuditResponse>> {
    let audit = state.audit_service.create(&caller, input).await?;
    Ok(ApiResponse::created(AuditResponse { audit }))
}

/// Update an audit and its responses.
async fn update_audit(
    AuthCaller(caller): AuthCaller,
    State(state): State<AppState>,
    Json(req): Json<UpdateAuditRequest>,
) -> AppResult<ApiResponse<AuditResponse>> {
    let audit = state
        .audit_service
        .update(&caller, &req.audit_id, req.input)
        .await?;
    Ok(ApiResponse::ok(AuditResponse { audit }))
}

/// Update the client's feedback on an audit.
async fn update_feedback(
    AuthCaller(caller): AuthCaller,
    State(state): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> AppResult<ApiResponse<AuditResponse>> {
    let audit = state
        .audit_service
        .update_feedback(&caller, &req.audit_id, req.input)
        .await?;
    Ok(ApiResponse::ok(AuditResponse { audit }))
}

/// Get an audit with responses and grouped questions.
async fn show_audit(
    AuthCaller(caller): AuthCaller,
    State(state): State<AppState>,
    Json(req): Json<AuditIdRequest>,
) -> AppResult<ApiResponse<AuditView>> {
    let view = state.audit_service.get(&caller, &req.audit_id).await?;
    Ok(ApiResponse::ok(view))
}

/// Get an audit's report.
async fn audit_report(
    AuthCaller(caller): AuthCaller,
    State(state): State<AppState>,
    Json(req): Json<AuditIdRequest>,
) -> AppResult<ApiResponse<AuditReport>> {
    let report = state
        .report_service
        .get_audit_report(&caller, &req.audit_id)
        .await?;
    Ok(ApiResponse::ok(report))
}

/// List audits.
async fn list_audits(
    AuthCaller(caller): AuthCaller,
    State(state): State<AppState>,
    Json(input): Json<ListAuditsInput>,
) -> AppResult<ApiResponse<Vec<AuditListEntry>>> {
    let audits = state.audit_service.list(&caller, input).await?;
    Ok(ApiResponse::ok(audits))
}

/// Delete an audit.
async fn delete_audit(
    AuthCaller(caller): AuthCaller,
    State(state): State<AppState>,
    Json(req): Json<AuditIdRequest>,
) -> AppResult<ApiResponse<()>> {
    state.audit_service.delete(&caller, &req.audit_id).await?;
    Ok(ApiResponse::ok(()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_audit))
        .route("/update", post(update_audit))
        .route("/feedback", post(update_feedback))
        .route("/show", post(show_audit))
        .route("/report", post(audit_report))
        .route("/list", post(list_audits))
        .route("/delete", post(delete_audit))
}
