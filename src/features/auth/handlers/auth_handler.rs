use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppForm, AppJson};
use crate::features::auth::dtos::{
    RegisterRequestDto, RegisterResponseDto, TokenRequestDto, TokenResponseDto,
};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::auth::services::AuthService;
use crate::shared::types::{ApiResponse, MessageDto};
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use validator::Validate;

/// Register a new user
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequestDto,
    responses(
        (status = 201, description = "User registered successfully", body = ApiResponse<RegisterResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 409, description = "User already exists")
    ),
    tag = "auth"
)]
pub async fn register(
    State(service): State<Arc<AuthService>>,
    AppJson(dto): AppJson<RegisterRequestDto>,
) -> Result<(StatusCode, Json<ApiResponse<RegisterResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let registered = service.register(dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(registered), None, None)),
    ))
}

/// Exchange username and password for an access token (OAuth2 password flow)
#[utoipa::path(
    post,
    path = "/token",
    request_body(content = TokenRequestDto, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Token issued", body = TokenResponseDto),
        (status = 400, description = "Malformed form body"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(service): State<Arc<AuthService>>,
    AppForm(dto): AppForm<TokenRequestDto>,
) -> Result<Json<TokenResponseDto>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let token = service.login(dto).await?;
    Ok(Json(token))
}

/// Revoke the current access token
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Logged out", body = ApiResponse<MessageDto>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn logout(
    user: AuthenticatedUser,
    State(service): State<Arc<AuthService>>,
) -> Result<Json<ApiResponse<MessageDto>>> {
    service.logout(&user).await?;
    Ok(Json(ApiResponse::success(
        Some(MessageDto::new("Logged out successfully")),
        None,
        None,
    )))
}
