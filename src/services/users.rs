//! User account service (self-scoped operations and teacher listing)

use crate::{
    error::{AppError, AppResult},
    models::user::{normalize_email, UpdateUser, User},
    repository::Repository,
};

use super::auth::AuthContext;

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// All accounts, newest first
    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.repository.users.list().await
    }

    /// The authenticated user's own record
    pub async fn current(&self, ctx: &AuthContext) -> AppResult<User> {
        self.repository
            .users
            .find_by_id(ctx.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User doesn't exist".to_string()))
    }

    /// Edit name and/or email of the authenticated user
    pub async fn update_current(&self, ctx: &AuthContext, mut changes: UpdateUser) -> AppResult<User> {
        self.current(ctx).await?;

        if let Some(ref email) = changes.email {
            let email = normalize_email(email);
            if let Some(other) = self.repository.users.find_by_email(&email).await? {
                if other.id != ctx.user_id {
                    return Err(AppError::Conflict("This email is already in use".to_string()));
                }
            }
            changes.email = Some(email);
        }
        changes.name = changes.name.map(|n| n.trim().to_string());

        self.repository.users.update(ctx.user_id, &changes).await
    }

    /// Delete the authenticated user's account
    pub async fn delete_current(&self, ctx: &AuthContext) -> AppResult<()> {
        self.current(ctx).await?;
        self.repository.users.delete(ctx.user_id).await?;

        tracing::info!("User {} deleted their account", ctx.user_id);
        Ok(())
    }
}
