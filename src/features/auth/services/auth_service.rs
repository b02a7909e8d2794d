use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::core::config::AuthConfig;
use crate::core::database::is_unique_violation;
use crate::core::error::{AppError, Result};
use crate::features::auth::dtos::{
    RegisterRequestDto, RegisterResponseDto, TokenRequestDto, TokenResponseDto,
};
use crate::features::auth::jwt::{token_fingerprint, JwtService};
use crate::features::auth::model::{AuthenticatedUser, SessionUser};
use crate::features::auth::password::{hash_password, verify_password};
use crate::features::users::models::User;
use crate::modules::storage::LocalStore;
use crate::shared::constants::ROLE_USER;
use crate::shared::validation::USERNAME_REGEX;

/// Service for registration, token issuance and bearer-token resolution
pub struct AuthService {
    pool: PgPool,
    jwt: JwtService,
    store: Arc<LocalStore>,
    default_max_upload_size: i64,
}

impl AuthService {
    pub fn new(
        pool: PgPool,
        config: &AuthConfig,
        store: Arc<LocalStore>,
        default_max_upload_size: i64,
    ) -> Self {
        Self {
            pool,
            jwt: JwtService::new(config),
            store,
            default_max_upload_size,
        }
    }

    /// Register a new user
    pub async fn register(&self, dto: RegisterRequestDto) -> Result<RegisterResponseDto> {
        if !USERNAME_REGEX.is_match(&dto.username) {
            return Err(AppError::Validation(
                "Username must start with a letter or underscore and contain only letters, digits and underscores".to_string(),
            ));
        }

        let password = dto.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))??;

        let user_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, password_hash, max_upload_size, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&dto.username)
        .bind(&password_hash)
        .bind(self.default_max_upload_size)
        .bind(ROLE_USER)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("User already exists".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

        // Upload writes create the directory again if this fails
        if let Err(e) = self.store.ensure_user_dir(user_id).await {
            tracing::warn!(user_id, "Could not create asset directory: {}", e);
        }

        tracing::info!(user_id, username = %dto.username, "User registered");

        Ok(RegisterResponseDto {
            message: "Registered successfully".to_string(),
            user_id,
        })
    }

    /// OAuth2 password grant
    pub async fn login(&self, dto: TokenRequestDto) -> Result<TokenResponseDto> {
        if let Some(grant_type) = dto.grant_type.as_deref() {
            if !grant_type.is_empty() && grant_type != "password" {
                return Err(AppError::BadRequest(format!(
                    "Unsupported grant_type: {}",
                    grant_type
                )));
            }
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, max_upload_size, role, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(&dto.username)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(invalid_credentials)?;

        let password = dto.password;
        let stored_hash = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
            .await
            .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))?;

        if !valid {
            tracing::info!(username = %user.username, "Rejected login with wrong password");
            return Err(invalid_credentials());
        }

        let purged = sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND expires_at <= NOW()")
            .bind(user.id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if purged > 0 {
            tracing::debug!(user_id = user.id, purged, "Purged expired sessions");
        }

        let session_id = Uuid::new_v4();
        let issued = self
            .jwt
            .issue(user.id, &user.username, &user.role, session_id)?;

        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(session_id)
        .bind(user.id)
        .bind(token_fingerprint(&issued.token))
        .bind(issued.expires_at)
        .execute(&self.pool)
        .await?;

        tracing::info!(user_id = user.id, %session_id, "Issued access token");

        Ok(TokenResponseDto {
            access_token: issued.token,
            token_type: "bearer".to_string(),
            expires_in: issued.expires_in,
        })
    }

    /// Revoke the session behind the caller's token
    pub async fn logout(&self, user: &AuthenticatedUser) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(user.session_id)
            .execute(&self.pool)
            .await?;

        tracing::info!(user_id = user.user_id, session_id = %user.session_id, "Session revoked");
        Ok(())
    }

    /// Resolve a bearer token to the user behind a live session
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser> {
        let claims = self.jwt.verify(token)?;

        let row = sqlx::query_as::<_, SessionUser>(
            r#"
            SELECT u.id AS user_id, u.username, u.role, u.max_upload_size
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.id = $1
              AND s.token_hash = $2
              AND s.expires_at > NOW()
              AND u.id = $3
            "#,
        )
        .bind(claims.sid)
        .bind(token_fingerprint(token))
        .bind(claims.uid)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(invalid_credentials)?;

        Ok(AuthenticatedUser {
            user_id: row.user_id,
            username: row.username,
            role: row.role,
            session_id: claims.sid,
            max_upload_size: row.max_upload_size,
        })
    }
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials".to_string())
}
