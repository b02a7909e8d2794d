use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::features::files::handlers::{
    delete_file, delete_metadata, download_file, download_version, get_metadata, list_files,
    list_versions, put_metadata, restore_version, upload_file,
};
use crate::features::files::services::{FileService, MetadataService};

/// Create routes for the files feature
pub fn routes(
    file_service: Arc<FileService>,
    metadata_service: Arc<MetadataService>,
    max_request_body_size: usize,
) -> Router {
    let files = Router::new()
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::max(max_request_body_size)),
        )
        .route("/files", get(list_files))
        .route("/download/{file_id}", get(download_file))
        .route("/delete/{file_id}", delete(delete_file))
        .route("/files/{file_id}/versions", get(list_versions))
        .route(
            "/files/{file_id}/versions/{version}/download",
            get(download_version),
        )
        .route(
            "/files/{file_id}/versions/{version}/restore",
            post(restore_version),
        )
        .with_state(file_service);

    let metadata = Router::new()
        .route(
            "/files/{file_id}/metadata",
            get(get_metadata).put(put_metadata),
        )
        .route("/files/{file_id}/metadata/{key}", delete(delete_metadata))
        .with_state(metadata_service);

    files.merge(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::StorageBackend;
    use crate::modules::storage::LocalStore;
    use crate::shared::test_helpers::{create_test_user, lazy_pool, with_user};
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn server(dir: &TempDir, max_upload_size: i64) -> TestServer {
        let pool = lazy_pool();
        let files = Arc::new(FileService::new(
            pool.clone(),
            Arc::new(LocalStore::new(dir.path())),
            StorageBackend::Disk,
        ));
        let metadata = Arc::new(MetadataService::new(pool, files.clone()));

        let mut user = create_test_user();
        user.max_upload_size = max_upload_size;
        TestServer::new(with_user(routes(files, metadata, 1024 * 1024), user)).unwrap()
    }

    #[tokio::test]
    async fn test_upload_requires_file_field() {
        let dir = TempDir::new().unwrap();
        let form = MultipartForm::new().add_text("note", "no file here");

        let response = server(&dir, 1024).post("/upload").multipart(form).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "File is required");
    }

    #[tokio::test]
    async fn test_upload_over_user_quota() {
        let dir = TempDir::new().unwrap();
        let part = Part::bytes(vec![7u8; 64])
            .file_name("big.bin")
            .mime_type("application/octet-stream");
        let form = MultipartForm::new().add_part("file", part);

        let response = server(&dir, 16).post("/upload").multipart(form).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "File too large");
    }

    #[tokio::test]
    async fn test_upload_over_body_limit() {
        let dir = TempDir::new().unwrap();
        let part = Part::bytes(vec![0u8; 2 * 1024 * 1024])
            .file_name("huge.bin")
            .mime_type("application/octet-stream");
        let form = MultipartForm::new().add_part("file", part);

        let response = server(&dir, i64::MAX).post("/upload").multipart(form).await;

        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_upload_rejects_dot_dot_filename() {
        let dir = TempDir::new().unwrap();
        let part = Part::bytes(b"x".to_vec())
            .file_name("..")
            .mime_type("text/plain");
        let form = MultipartForm::new().add_part("file", part);

        let response = server(&dir, 1024).post("/upload").multipart(form).await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_put_metadata_validates_keys_first() {
        let dir = TempDir::new().unwrap();
        let response = server(&dir, 1024)
            .put("/files/1/metadata")
            .json(&json!({"bad key": "v"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_put_metadata_rejects_non_string_values() {
        let dir = TempDir::new().unwrap();
        let response = server(&dir, 1024)
            .put("/files/1/metadata")
            .json(&json!({"reference": true}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
