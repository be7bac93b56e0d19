//! Book (catalog) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::loan::Loan;

/// Book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,
    pub author: String,
    pub title: String,
    pub category: String,
    /// 13-character ISBN, unique across the catalog
    pub isbn: String,
    pub created_at: DateTime<Utc>,
}

/// Book together with every loan that references it
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    pub loans: Vec<Loan>,
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(
        min = 2,
        max = 100,
        message = "The author name must be between 2 and 100 characters long"
    ))]
    pub author: String,
    #[validate(length(
        min = 2,
        max = 100,
        message = "The title must be between 2 and 100 characters long"
    ))]
    pub title: String,
    #[validate(length(
        min = 2,
        max = 100,
        message = "The category must be between 2 and 100 characters long"
    ))]
    pub category: String,
    #[validate(length(equal = 13, message = "The ISBN must be exactly 13 characters long"))]
    pub isbn: String,
}

/// Update book request; absent fields are left unchanged
#[derive(Debug, Default, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(
        min = 2,
        max = 100,
        message = "The author name must be between 2 and 100 characters long"
    ))]
    pub author: Option<String>,
    #[validate(length(
        min = 2,
        max = 100,
        message = "The title must be between 2 and 100 characters long"
    ))]
    pub title: Option<String>,
    #[validate(length(
        min = 2,
        max = 100,
        message = "The category must be between 2 and 100 characters long"
    ))]
    pub category: Option<String>,
    #[validate(length(equal = 13, message = "The ISBN must be exactly 13 characters long"))]
    pub isbn: Option<String>,
}

impl UpdateBook {
    /// Apply the supplied fields onto an existing record
    pub fn apply_to(&self, book: &mut Book) {
        if let Some(ref author) = self.author {
            book.author = author.clone();
        }
        if let Some(ref title) = self.title {
            book.title = title.clone();
        }
        if let Some(ref category) = self.category {
            book.category = category.clone();
        }
        if let Some(ref isbn) = self.isbn {
            book.isbn = isbn.clone();
        }
    }
}
