//! Loan model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Upper bound on concurrently open loans held by a single user
pub const MAX_LOANS_PER_USER: i64 = 3;

/// Loan model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub loan_date: DateTime<Utc>,
    /// `None` while the book is still out
    pub return_date: Option<DateTime<Utc>>,
}

impl Loan {
    /// Fresh open loan dated `loan_date`
    pub fn open(user_id: Uuid, book_id: Uuid, loan_date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            book_id,
            loan_date,
            return_date: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }
}

/// Checkout request. The borrower is always the authenticated user.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoan {
    pub book_id: Uuid,
}

/// Optional body of a return request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnLoan {
    /// Defaults to the time of the request
    pub return_date: Option<DateTime<Utc>>,
}
