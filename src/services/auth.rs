//! Authentication service: accounts, credentials and bearer resolution

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use uuid::Uuid;

use super::tokens::{TokenError, TokenService};
use crate::{
    error::{AppError, AppResult},
    models::user::{normalize_email, SignIn, SignUp, User},
    repository::Repository,
};

/// Identity resolved from a verified bearer token, threaded to downstream services
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
}

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(repository: Repository, tokens: TokenService) -> Self {
        Self { repository, tokens }
    }

    /// Create an account and open a session for it
    pub async fn sign_up(&self, request: SignUp) -> AppResult<(User, String)> {
        let email = normalize_email(&request.email);

        if self.repository.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("This email is already in use".to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            email,
            password: self.hash_password(&request.password)?,
            role: request.role,
            created_at: Utc::now(),
        };

        let created = self.repository.users.create(&user).await?;
        let token = self.tokens.issue(created.id)?;

        tracing::info!("User {} signed up as {}", created.id, created.role);

        Ok((created, token))
    }

    /// Check credentials and open a session
    pub async fn sign_in(&self, request: SignIn) -> AppResult<(User, String)> {
        let user = self
            .repository
            .users
            .find_by_email(&normalize_email(&request.email))
            .await?
            .ok_or_else(|| AppError::Authentication("Incorrect email or password".to_string()))?;

        if !self.verify_password(&user, &request.password)? {
            tracing::warn!("Rejected sign-in for user {}", user.id);
            return Err(AppError::Authentication("Incorrect email or password".to_string()));
        }

        let token = self.tokens.issue(user.id)?;
        Ok((user, token))
    }

    /// Resolve an `Authorization` header value into a live identity.
    ///
    /// Only the token subject is trusted; the user must still exist.
    pub async fn authenticate(&self, header: Option<&str>) -> AppResult<AuthContext> {
        let token = header
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Authentication("Token not provided".to_string()))?;

        let user_id = self.tokens.verify(token).map_err(|e| {
            tracing::warn!("Rejected bearer token: {}", e);
            match e {
                TokenError::Invalid => AppError::Authentication("Invalid token".to_string()),
                TokenError::Expired => AppError::Authentication("Expired token".to_string()),
            }
        })?;

        let user = self
            .repository
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Authentication("User not found".to_string()))?;

        Ok(AuthContext { user_id: user.id })
    }

    /// Verify user password
    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }
}
