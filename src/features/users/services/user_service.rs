use std::sync::Arc;

use serde_json::Value;
use sqlx::PgPool;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::memory::services::{MemoryKind, MemoryStore};
use crate::features::users::dtos::{AdminUpdateUserDto, ProfileResponseDto, UserResponseDto};
use crate::features::users::models::User;
use crate::modules::storage::LocalStore;
use crate::shared::constants::VALID_ROLES;
use crate::shared::types::MessageDto;

/// Service for account lookups, deletion and admin changes
pub struct UserService {
    pool: PgPool,
    store: Arc<LocalStore>,
    memory: Arc<MemoryStore>,
}

impl UserService {
    pub fn new(pool: PgPool, store: Arc<LocalStore>, memory: Arc<MemoryStore>) -> Self {
        Self {
            pool,
            store,
            memory,
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, max_upload_size, role, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to look up user: {:?}", e);
            AppError::Database(e)
        })
    }

    pub async fn get_profile(&self, user: &AuthenticatedUser) -> Result<ProfileResponseDto> {
        let account = self
            .find_by_username(&user.username)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let user_profile = self
            .memory
            .get(account.id, MemoryKind::LongTerm, "user_profile")
            .await?
            .unwrap_or_else(|| Value::Object(Default::default()));

        Ok(ProfileResponseDto {
            user_id: account.id,
            username: account.username,
            role: account.role,
            max_upload_size: account.max_upload_size,
            created_at: account.created_at,
            user_profile,
        })
    }

    /// Delete the caller's own account; rows cascade, directories are
    /// removed best-effort
    pub async fn delete_user(&self, caller: &AuthenticatedUser, username: &str) -> Result<MessageDto> {
        if caller.username != username {
            return Err(AppError::Forbidden(
                "You can only delete your own account.".to_string(),
            ));
        }

        let account = self
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(account.id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete user: {:?}", e);
                AppError::Database(e)
            })?;

        self.store.remove_user_dir(account.id).await;
        self.memory.remove_user(account.id).await;

        tracing::info!(user_id = account.id, username, "User deleted");

        Ok(MessageDto::new(format!(
            "User {} and all associated data deleted successfully",
            username
        )))
    }

    pub async fn admin_update(
        &self,
        username: &str,
        dto: AdminUpdateUserDto,
    ) -> Result<UserResponseDto> {
        if dto.max_upload_size.is_none() && dto.role.is_none() {
            return Err(AppError::Validation(
                "Provide max_upload_size and/or role".to_string(),
            ));
        }
        if let Some(role) = dto.role.as_deref() {
            if !VALID_ROLES.contains(&role) {
                return Err(AppError::Validation(format!(
                    "Role must be one of: {}",
                    VALID_ROLES.join(", ")
                )));
            }
        }

        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET max_upload_size = COALESCE($2, max_upload_size),
                role = COALESCE($3, role)
            WHERE username = $1
            RETURNING id, username, password_hash, max_upload_size, role, created_at
            "#,
        )
        .bind(username)
        .bind(dto.max_upload_size)
        .bind(dto.role.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update user: {:?}", e);
            AppError::Database(e)
        })?
        .ok_or_else(|| AppError::NotFound(format!("User '{}' not found", username)))?;

        tracing::info!(
            user_id = updated.id,
            role = %updated.role,
            max_upload_size = updated.max_upload_size,
            "User updated by admin"
        );

        Ok(updated.into())
    }
}
