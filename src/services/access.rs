//! Role gate for teacher-only actions

use crate::{
    error::{AppError, AppResult},
    models::{Role, User},
    repository::Repository,
};

use super::auth::AuthContext;

#[derive(Clone)]
pub struct Authorizer {
    repository: Repository,
}

impl Authorizer {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Fetch the caller and require the TEACHER role.
    ///
    /// The role is read live, so a demoted or deleted account loses access
    /// even while its token is still valid.
    pub async fn require_teacher(&self, ctx: &AuthContext) -> AppResult<User> {
        let user = self
            .repository
            .users
            .find_by_id(ctx.user_id)
            .await?
            .ok_or_else(|| AppError::Authentication("Unauthenticated user".to_string()))?;

        match user.role {
            Role::Teacher => Ok(user),
            Role::Student => {
                tracing::warn!("User {} denied a teacher-only action", user.id);
                Err(AppError::Authentication(
                    "You don't have access to this action".to_string(),
                ))
            }
        }
    }
}
