//! Loans repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Transaction};
use uuid::Uuid;

use super::{conflict_on_unique, CheckoutTx, LoanStore, BOOK_ON_LOAN, BORROWER_GONE};
use crate::{
    error::{AppError, AppResult},
    models::{Book, Loan},
};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanStore for LoansRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(loan)
    }

    async fn list(&self) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>("SELECT * FROM loans ORDER BY loan_date")
            .fetch_all(&self.pool)
            .await?;

        Ok(loans)
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE user_id = $1 ORDER BY loan_date",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    async fn list_by_book(&self, book_id: Uuid) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE book_id = $1 ORDER BY loan_date",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    async fn begin_checkout(
        &self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> AppResult<Box<dyn CheckoutTx>> {
        let mut tx = self.pool.begin().await?;

        // Lock order is always borrower then book, so two checkouts can
        // never wait on each other in a cycle.
        let borrower = sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

        if borrower.is_none() {
            return Err(AppError::Authentication(BORROWER_GONE.to_string()));
        }

        tracing::debug!("Checkout transaction opened for user={} book={}", user_id, book_id);

        Ok(Box::new(PgCheckout { tx }))
    }

    async fn mark_returned(
        &self,
        id: Uuid,
        return_date: DateTime<Utc>,
    ) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans
            SET return_date = $2
            WHERE id = $1 AND return_date IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(return_date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(loan)
    }
}

/// Checkout running inside one Postgres transaction
struct PgCheckout {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CheckoutTx for PgCheckout {
    async fn find_book(&mut self, book_id: Uuid) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(book)
    }

    async fn open_loan_for_book(&mut self, book_id: Uuid) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE book_id = $1 AND return_date IS NULL LIMIT 1",
        )
        .bind(book_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(loan)
    }

    async fn open_loan_for_user_book(
        &mut self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            SELECT * FROM loans
            WHERE user_id = $1 AND book_id = $2 AND return_date IS NULL
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(loan)
    }

    async fn count_open_loans(&mut self, user_id: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE user_id = $1 AND return_date IS NULL",
        )
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(count)
    }

    async fn insert(&mut self, loan: &Loan) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (id, user_id, book_id, loan_date, return_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(loan.id)
        .bind(loan.user_id)
        .bind(loan.book_id)
        .bind(loan.loan_date)
        .bind(loan.return_date)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                AppError::Authentication(BORROWER_GONE.to_string())
            }
            _ => conflict_on_unique(e, BOOK_ON_LOAN),
        })
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
