//! Loan engine: checkout and return transitions

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Loan, MAX_LOANS_PER_USER},
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// All loans in the system
    pub async fn list_loans(&self) -> AppResult<Vec<Loan>> {
        self.repository.loans.list().await
    }

    /// Full loan history of a user, ordered by loan date
    pub async fn get_user_loans(&self, user_id: Uuid) -> AppResult<Vec<Loan>> {
        if self.repository.users.find_by_id(user_id).await?.is_none() {
            return Err(AppError::NotFound("User doesn't exist".to_string()));
        }
        self.repository.loans.list_by_user(user_id).await
    }

    /// Lend `book_id` to `user_id`.
    ///
    /// All checks and the insert run in one checkout transaction; any early
    /// return drops it and rolls back. The book-level check always runs
    /// before the per-user checks.
    pub async fn checkout(&self, user_id: Uuid, book_id: Uuid) -> AppResult<Loan> {
        let mut tx = self.repository.loans.begin_checkout(user_id, book_id).await?;

        if tx.find_book(book_id).await?.is_none() {
            return Err(AppError::NotFound("Book not found".to_string()));
        }

        if tx.open_loan_for_book(book_id).await?.is_some() {
            return Err(AppError::Conflict("This book is already on loan".to_string()));
        }

        if tx.open_loan_for_user_book(user_id, book_id).await?.is_some() {
            return Err(AppError::Conflict(
                "User already has this book on loan".to_string(),
            ));
        }

        let active = tx.count_open_loans(user_id).await?;
        if active >= MAX_LOANS_PER_USER {
            return Err(AppError::Conflict(format!(
                "User has reached the maximum limit of {} active loans",
                MAX_LOANS_PER_USER
            )));
        }

        let loan = tx.insert(&Loan::open(user_id, book_id, Utc::now())).await?;
        tx.commit().await?;

        tracing::info!("Loan {} opened: user={} book={}", loan.id, user_id, book_id);
        Ok(loan)
    }

    /// Close an open loan. A loan is returned exactly once.
    pub async fn complete(
        &self,
        loan_id: Uuid,
        return_date: Option<DateTime<Utc>>,
    ) -> AppResult<Loan> {
        let loan = self
            .repository
            .loans
            .find_by_id(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound("This loan doesn't exist".to_string()))?;

        if loan.return_date.is_some() {
            return Err(AppError::Conflict("Loan already completed".to_string()));
        }

        let return_date = return_date.unwrap_or_else(Utc::now);
        if return_date < loan.loan_date {
            return Err(AppError::validation("Return date cannot precede the loan date"));
        }

        // A concurrent return may win between the read above and this update
        let completed = self
            .repository
            .loans
            .mark_returned(loan_id, return_date)
            .await?
            .ok_or_else(|| AppError::Conflict("Loan already completed".to_string()))?;

        tracing::info!("Loan {} returned at {}", completed.id, return_date);
        Ok(completed)
    }
}
