use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Request DTO for user registration
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterRequestDto {
    #[validate(length(min = 1, max = 50, message = "Username must be 1-50 characters"))]
    pub username: String,

    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be 8-128 characters"
    ))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponseDto {
    pub message: String,
    pub user_id: i64,
}

/// OAuth2 password-flow form body
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TokenRequestDto {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    /// Accepted for OAuth2 client compatibility; only `password` is supported
    #[serde(default)]
    pub grant_type: Option<String>,
}

/// OAuth2 token response, returned without the API envelope
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponseDto {
    pub access_token: String,
    /// Always "bearer"
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
}
