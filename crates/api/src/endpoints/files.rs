//! Evidence file endpoints.

use audit_common::{AppError, AppResult, FileRef};
use audit_core::UploadInput;
use axum::{
    Json, Router,
    extract::{Multipart, State},
    routing::post,
};
use serde::Deserialize;

use crate::{extractors::AuthCaller, middleware::AppState, response::ApiResponse};

/// Request to delete a file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFileRequest {
    pub file_id: String,
}

/// Upload a file via multipart form.
async fn upload_file(
    AuthCaller(caller): AuthCaller,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<FileRef>> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut content_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                if file_name.is_none() {
                    file_name = field.file_name().map(str::to_string);
                }
                content_type = field.content_type().map(str::to_string);
                file_data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?
                        .to_vec(),
                );
            }
            "name" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                if !text.is_empty() {
                    file_name = Some(text);
                }
            }
            _ => {}
        }
    }

    let data = file_data.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;
    let input = UploadInput {
        name: file_name.unwrap_or_else(|| "untitled".to_string()),
        content_type: content_type.unwrap_or_default(),
        data,
    };

    let file = state.upload_service.upload(&caller, input).await?;
    Ok(ApiResponse::created(file))
}

/// Delete a file.
async fn delete_file(
    AuthCaller(caller): AuthCaller,
    State(state): State<AppState>,
    Json(req): Json<DeleteFileRequest>,
) -> AppResult<ApiResponse<()>> {
    state.upload_service.delete(&caller, &req.file_id).await?;
    Ok(ApiResponse::ok(()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_file))
        .route("/delete", post(delete_file))
}
