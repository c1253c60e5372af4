//! Survey endpoints.

use audit_common::AppResult;
use audit_core::{AuditBrief, ListSurveysInput, SurveyInput, SurveySummary, SurveyView};
use audit_db::entities::survey;
use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthCaller, middleware::AppState, response::ApiResponse};

/// Request naming one survey.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyIdRequest {
    pub survey_id: String,
}

/// Request to update a survey.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSurveyRequest {
    pub survey_id: String,
    #[serde(flatten)]
    pub input: SurveyInput,
}

/// A written survey.
#[derive(Debug, Serialize)]
pub struct SurveyResponse {
    pub survey: survey::Model,
}

/// Create a survey.
async fn create_survey(
    AuthCaller(caller): AuthCaller,
    State(state): State<AppState>,
    Json(input): Json<SurveyInput>,
) -> AppResult<ApiResponse<SurveyResponse>> {
    let survey = state.survey_service.create(&caller, input).await?;
    Ok(ApiResponse::created(SurveyResponse { survey }))
}

/// Update a survey, replacing its categories and questions.
async fn update_survey(
    AuthCaller(caller): AuthCaller,
    State(state): State<AppState>,
    Json(req): Json<UpdateSurveyRequest>,
) -> AppResult<ApiResponse<SurveyResponse>> {
    let survey = state
        .survey_service
        .update(&caller, &req.survey_id, req.input)
        .await?;
    Ok(ApiResponse::ok(SurveyResponse { survey }))
}

/// Delete a survey.
async fn delete_survey(
    AuthCaller(caller): AuthCaller,
    State(state): State<AppState>,
    Json(req): Json<SurveyIdRequest>,
) -> AppResult<ApiResponse<()>> {
    state.survey_service.delete(&caller, &req.survey_id).await?;
    Ok(ApiResponse::ok(()))
}

/// Get a survey with grouped questions.
async fn show_survey(
    AuthCaller(caller): AuthCaller,
    State(state): State<AppState>,
    Json(req): Json<SurveyIdRequest>,
) -> AppResult<ApiResponse<SurveyView>> {
    let view = state.survey_service.get(&caller, &req.survey_id).await?;
    Ok(ApiResponse::ok(view))
}

/// List surveys.
async fn list_surveys(
    AuthCaller(caller): AuthCaller,
    State(state): State<AppState>,
    Json(input): Json<ListSurveysInput>,
) -> AppResult<ApiResponse<Vec<SurveySummary>>> {
    let surveys = state.survey_service.list(&caller, input).await?;
    Ok(ApiResponse::ok(surveys))
}

/// List the audits of a survey.
async fn survey_audits(
    AuthCaller(caller): AuthCaller,
    State(state): State<AppState>,
    Json(req): Json<SurveyIdRequest>,
) -> AppResult<ApiResponse<Vec<AuditBrief>>> {
    let audits = state
        .audit_service
        .list_for_survey(&caller, &req.survey_id)
        .await?;
    Ok(ApiResponse::ok(audits))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_survey))
        .route("/update", post(update_survey))
        .route("/delete", post(delete_survey))
        .route("/show", post(show_survey))
        .route("/list", post(list_surveys))
        .route("/audits", post(survey_audits))
}
