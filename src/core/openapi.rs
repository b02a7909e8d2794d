use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::auth::{dtos as auth_dtos, handlers as auth_handlers};
use crate::features::files::{dtos as files_dtos, handlers as files_handlers};
use crate::features::memory::{dtos as memory_dtos, handlers as memory_handlers};
use crate::features::queries::{dtos as queries_dtos, handlers as queries_handlers};
use crate::features::users::{dtos as users_dtos, handlers as users_handlers};
use crate::shared::types::{ApiResponse, MessageDto, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        auth_handlers::register,
        auth_handlers::login,
        auth_handlers::logout,
        // Users
        users_handlers::get_profile,
        users_handlers::delete_user,
        users_handlers::admin_update_user,
        // Files
        files_handlers::upload_file,
        files_handlers::list_files,
        files_handlers::download_file,
        files_handlers::delete_file,
        files_handlers::list_versions,
        files_handlers::download_version,
        files_handlers::restore_version,
        files_handlers::get_metadata,
        files_handlers::put_metadata,
        files_handlers::delete_metadata,
        // Memory
        memory_handlers::get_memory,
        memory_handlers::update_long_term,
        memory_handlers::clear_short_term,
        memory_handlers::set_active_url,
        // Queries
        queries_handlers::ask,
        queries_handlers::list_queries,
        queries_handlers::get_query,
    ),
    components(
        schemas(
            Meta,
            MessageDto,
            ApiResponse<MessageDto>,
            // Auth
            auth_dtos::RegisterRequestDto,
            auth_dtos::RegisterResponseDto,
            auth_dtos::TokenRequestDto,
            auth_dtos::TokenResponseDto,
            ApiResponse<auth_dtos::RegisterResponseDto>,
            // Users
            users_dtos::ProfileResponseDto,
            users_dtos::UserResponseDto,
            users_dtos::AdminUpdateUserDto,
            ApiResponse<users_dtos::ProfileResponseDto>,
            ApiResponse<users_dtos::UserResponseDto>,
            // Files
            files_dtos::UploadFileDto,
            files_dtos::UploadResponseDto,
            files_dtos::FileResponseDto,
            files_dtos::FileListDto,
            files_dtos::DeleteFileResponseDto,
            files_dtos::FileVersionDto,
            files_dtos::FileVersionsDto,
            files_dtos::FileMetadataDto,
            files_dtos::UpdateMetadataDto,
            ApiResponse<files_dtos::UploadResponseDto>,
            ApiResponse<files_dtos::FileListDto>,
            ApiResponse<files_dtos::DeleteFileResponseDto>,
            ApiResponse<files_dtos::FileVersionsDto>,
            ApiResponse<files_dtos::FileMetadataDto>,
            // Memory
            memory_dtos::MemoryDto,
            memory_dtos::LongTermPatchDto,
            memory_dtos::MemoryDocumentDto,
            memory_dtos::ActiveUrlRequestDto,
            memory_dtos::StatusDto,
            ApiResponse<memory_dtos::MemoryDto>,
            ApiResponse<memory_dtos::MemoryDocumentDto>,
            // Queries
            queries_dtos::QueryRequestDto,
            queries_dtos::QueryResponseDto,
            queries_dtos::QueryRecordDto,
            ApiResponse<queries_dtos::QueryResponseDto>,
            ApiResponse<queries_dtos::QueryRecordDto>,
            ApiResponse<Vec<queries_dtos::QueryRecordDto>>,
        )
    ),
    tags(
        (name = "auth", description = "Registration and bearer tokens"),
        (name = "users", description = "Account management"),
        (name = "files", description = "File storage, versions and metadata"),
        (name = "memory", description = "Per-user assistant memory"),
        (name = "queries", description = "Assistant queries with memory context"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Thoth API",
        version = "0.1.0",
        description = "API documentation for Thoth",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/register",
            "/token",
            "/upload",
            "/files/{file_id}/versions/{version}/restore",
            "/memory/long-term",
            "/active_url",
            "/query",
            "/queries/{query_id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn test_bearer_scheme_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
