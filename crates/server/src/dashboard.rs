//! Export, data presence and file endpoints.

use std::collections::HashMap;

use api_types::{component::HasData, files::FilesQuery};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use engine::{ExportRequest, ExportResult, FileCategory, FileInfo};

use crate::{
    ServerError,
    server::{JsonBody, ServerState, blocking},
};

pub async fn export(
    State(state): State<ServerState>,
    JsonBody(payload): JsonBody<ExportRequest>,
) -> Result<Json<ExportResult>, ServerError> {
    let result = blocking(&state, move |engine| engine.export_dashboard(&payload)).await?;
    Ok(Json(result))
}

pub async fn has_data(
    State(state): State<ServerState>,
    Path((kind, instance_id)): Path<(String, String)>,
) -> Result<Json<HasData>, ServerError> {
    let has_data = {
        let instance_id = instance_id.clone();
        blocking(&state, move |engine| {
            engine.check_component_has_data(&kind, &instance_id)
        })
        .await?
    };
    Ok(Json(HasData {
        instance_id,
        has_data,
    }))
}

/// Body maps instance ids to component types.
pub async fn batch_has_data(
    State(state): State<ServerState>,
    JsonBody(payload): JsonBody<HashMap<String, String>>,
) -> Result<Json<HashMap<String, bool>>, ServerError> {
    let checks = blocking(&state, move |engine| engine.batch_check_has_data(&payload)).await?;
    Ok(Json(checks))
}

pub async fn list_files(
    State(state): State<ServerState>,
    Query(query): Query<FilesQuery>,
) -> Result<Json<Vec<FileInfo>>, ServerError> {
    let category = match query.category.as_deref() {
        None | Some("") => FileCategory::AllFiles,
        Some(raw) => raw.parse()?,
    };
    let files = blocking(&state, move |engine| engine.files_by_category(category)).await?;
    Ok(Json(files))
}

/// `attachment` with a quoted ASCII fallback name plus the exact name as an
/// RFC 5987 `filename*`.
fn attachment_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    )
}

pub async fn download_file(
    State(state): State<ServerState>,
    Path(file_id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let path = {
        let file_id = file_id.clone();
        blocking(&state, move |engine| engine.file_download_path(&file_id)).await?
    };
    let body = tokio::fs::read(&path)
        .await
        .map_err(engine::EngineError::from)?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, attachment_disposition(&file_id)),
        ],
        body,
    ))
}
