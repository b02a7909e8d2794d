use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::features::files::models::{File, FileVersion};

/// Upload form for OpenAPI documentation.
/// The handler reads the multipart stream directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadFileDto {
    /// The file to upload
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponseDto {
    pub file_id: i64,
    pub filename: String,
    pub size: i64,
    pub content_type: String,
    /// Version number now current (1 for a new file)
    pub version: i32,
    pub uploaded_at: DateTime<Utc>,
}

impl From<File> for UploadResponseDto {
    fn from(file: File) -> Self {
        Self {
            file_id: file.id,
            filename: file.filename,
            size: file.size,
            content_type: file.content_type,
            version: file.current_version,
            uploaded_at: file.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileResponseDto {
    pub id: i64,
    pub filename: String,
    pub size: i64,
    pub content_type: String,
    pub checksum: String,
    pub current_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<File> for FileResponseDto {
    fn from(file: File) -> Self {
        Self {
            id: file.id,
            filename: file.filename,
            size: file.size,
            content_type: file.content_type,
            checksum: file.checksum,
            current_version: file.current_version,
            created_at: file.created_at,
            updated_at: file.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileListDto {
    pub files: Vec<FileResponseDto>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteFileResponseDto {
    pub message: String,
    pub file_id: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileVersionDto {
    pub version_number: i32,
    pub size: i64,
    pub content_type: String,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

impl From<FileVersion> for FileVersionDto {
    fn from(version: FileVersion) -> Self {
        Self {
            version_number: version.version_number,
            size: version.size,
            content_type: version.content_type,
            checksum: version.checksum,
            created_at: version.created_at,
        }
    }
}

/// Archived versions of a file, newest first
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileVersionsDto {
    pub file_id: i64,
    pub filename: String,
    pub current_version: i32,
    pub versions: Vec<FileVersionDto>,
}
