use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::auth::guards::RequireAdmin;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::users::dtos::{AdminUpdateUserDto, ProfileResponseDto, UserResponseDto};
use crate::features::users::services::UserService;
use crate::shared::types::{ApiResponse, MessageDto};
use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use validator::Validate;

#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "Profile retrieved successfully", body = ApiResponse<ProfileResponseDto>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_profile(
    user: AuthenticatedUser,
    State(service): State<Arc<UserService>>,
) -> Result<Json<ApiResponse<ProfileResponseDto>>> {
    let profile = service.get_profile(&user).await?;
    Ok(Json(ApiResponse::success(Some(profile), None, None)))
}

#[utoipa::path(
    delete,
    path = "/user/{username}",
    params(
        ("username" = String, Path, description = "Account to delete; must be the caller")
    ),
    responses(
        (status = 200, description = "Account deleted", body = ApiResponse<MessageDto>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the caller's account"),
        (status = 404, description = "User not found")
    ),
    tag = "users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_user(
    user: AuthenticatedUser,
    State(service): State<Arc<UserService>>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<MessageDto>>> {
    let result = service.delete_user(&user, &username).await?;
    Ok(Json(ApiResponse::success(Some(result), None, None)))
}

#[utoipa::path(
    patch,
    path = "/api/admin/users/{username}",
    params(
        ("username" = String, Path, description = "Account to update")
    ),
    request_body = AdminUpdateUserDto,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "User not found")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn admin_update_user(
    RequireAdmin(_admin): RequireAdmin,
    State(service): State<Arc<UserService>>,
    Path(username): Path<String>,
    AppJson(dto): AppJson<AdminUpdateUserDto>,
) -> Result<Json<ApiResponse<UserResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let updated = service.admin_update(&username, dto).await?;
    Ok(Json(ApiResponse::success(Some(updated), None, None)))
}
