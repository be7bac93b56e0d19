//! User model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Account role. Only teachers may curate the catalog or read other users' history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Teacher => "TEACHER",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STUDENT" => Ok(Role::Student),
            "TEACHER" => Ok(Role::Teacher),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

// SQLx conversion for Role (stored as TEXT)
impl sqlx::Type<Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing, default)]
    pub password: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Trim and lower-case an email so lookups and the uniqueness constraint agree
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// At least one lowercase letter, one uppercase letter and one digit
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if has_lower && has_upper && has_digit {
        Ok(())
    } else {
        let mut err = ValidationError::new("password_strength");
        err.message = Some(
            "Password must contain at least one uppercase letter, one lowercase letter, and one number"
                .into(),
        );
        Err(err)
    }
}

/// Sign-up request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignUp {
    #[validate(length(
        min = 2,
        max = 100,
        message = "The name must be between 2 and 100 characters long"
    ))]
    pub name: String,
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(
        length(
            min = 6,
            max = 100,
            message = "The password must be between 6 and 100 characters long"
        ),
        custom(function = "validate_password_strength")
    )]
    pub password: String,
    pub role: Role,
}

/// Sign-in request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignIn {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(
        length(
            min = 6,
            max = 100,
            message = "The password must be between 6 and 100 characters long"
        ),
        custom(function = "validate_password_strength")
    )]
    pub password: String,
}

/// Edit own account request
#[derive(Debug, Default, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(
        min = 2,
        max = 100,
        message = "The name must be between 2 and 100 characters long"
    ))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email"))]
    pub email: Option<String>,
}

/// Public profile returned at sign-in
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_text() {
        assert_eq!("TEACHER".parse::<Role>(), Ok(Role::Teacher));
        assert_eq!(Role::Student.to_string(), "STUDENT");
        assert!("teacher".parse::<Role>().is_err());
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@school.test".into(),
            password: "$argon2id$secret".into(),
            role: Role::Student,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "STUDENT");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_sign_up_rules() {
        let mut request = SignUp {
            name: "Ada".into(),
            email: "ada@school.test".into(),
            password: "Secret1".into(),
            role: Role::Student,
        };
        assert!(request.validate().is_ok());

        request.password = "secret1".into();
        assert!(request.validate().is_err());

        request.password = "Secret1".into();
        request.email = "not-an-email".into();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@School.Test "), "ada@school.test");
    }
}
