use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::dtos::{
    DeleteFileResponseDto, FileListDto, UploadFileDto, UploadResponseDto,
};
use crate::features::files::services::{FileContent, FileService};
use crate::shared::types::ApiResponse;

/// Upload a file
///
/// Accepts multipart/form-data with a single `file` field. Uploading a name
/// the caller already owns stores the previous content as a version.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "files",
    request_body(
        content = UploadFileDto,
        content_type = "multipart/form-data",
        description = "File upload form",
    ),
    responses(
        (status = 201, description = "File uploaded successfully", body = ApiResponse<UploadResponseDto>),
        (status = 400, description = "Missing file, invalid filename or file too large"),
        (status = 401, description = "Authentication required"),
        (status = 413, description = "Request body exceeds the server limit")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_file(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<UploadResponseDto>>), AppError> {
    let mut upload: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or("").to_string();

        if field_name != "file" {
            debug!("Ignoring unknown field: {}", field_name);
            continue;
        }

        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let file_name = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::BadRequest("Filename is required".to_string()))?;
        let data = field.bytes().await.map_err(multipart_error)?;

        upload = Some((file_name, content_type, data.to_vec()));
    }

    let (file_name, content_type, data) =
        upload.ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;

    let response = service
        .upload(&user, &file_name, &content_type, data)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(response), None, None)),
    ))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    debug!("Failed to read multipart data: {}", e);
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("File too large".to_string())
    } else {
        AppError::BadRequest(format!("Failed to read multipart data: {}", e.body_text()))
    }
}

/// List the caller's files
#[utoipa::path(
    get,
    path = "/files",
    tag = "files",
    responses(
        (status = 200, description = "Files owned by the caller", body = ApiResponse<FileListDto>),
        (status = 401, description = "Authentication required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_files(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
) -> Result<Json<ApiResponse<FileListDto>>, AppError> {
    let files = service.list(&user).await?;
    Ok(Json(ApiResponse::success(Some(files), None, None)))
}

/// Download the current content of a file
#[utoipa::path(
    get,
    path = "/download/{file_id}",
    tag = "files",
    params(
        ("file_id" = i64, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File bytes", content_type = "application/octet-stream"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "File belongs to another user"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn download_file(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Path(file_id): Path<i64>,
) -> Result<Response, AppError> {
    let content = service.download(&user, file_id).await?;
    attachment(content)
}

/// Delete a file with its versions and metadata
#[utoipa::path(
    delete,
    path = "/delete/{file_id}",
    tag = "files",
    params(
        ("file_id" = i64, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File deleted successfully", body = ApiResponse<DeleteFileResponseDto>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "File belongs to another user"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_file(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<DeleteFileResponseDto>>, AppError> {
    let deleted = service.delete(&user, file_id).await?;
    Ok(Json(ApiResponse::success(Some(deleted), None, None)))
}

/// Build an `application/octet-stream` attachment response
pub fn attachment(content: FileContent) -> Result<Response, AppError> {
    let disposition = content_disposition(&content.filename);
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| AppError::Internal(format!("Invalid Content-Disposition: {}", e)))?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content.bytes,
    )
        .into_response())
}

/// RFC 5987 `filename*` so non-ASCII names survive
pub fn content_disposition(filename: &str) -> String {
    format!(
        "attachment; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_percent_encodes() {
        assert_eq!(
            content_disposition("report.pdf"),
            "attachment; filename*=UTF-8''report.pdf"
        );
        assert_eq!(
            content_disposition("résumé final.txt"),
            "attachment; filename*=UTF-8''r%C3%A9sum%C3%A9%20final.txt"
        );
    }

    #[test]
    fn test_attachment_headers() {
        let response = attachment(FileContent {
            filename: "a b.txt".to_string(),
            bytes: b"hello".to_vec(),
        })
        .unwrap();

        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/octet-stream"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename*=UTF-8''a%20b.txt"
        );
    }
}
