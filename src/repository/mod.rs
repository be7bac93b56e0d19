//! Repository layer: storage contracts and their adapters
//!
//! Services only see the traits below. `Repository::postgres` wires the
//! sqlx adapters used in production; `Repository::in_memory` wires the
//! in-process store used by tests and local experiments.

pub mod books;
pub mod loans;
pub mod memory;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{book::UpdateBook, user::UpdateUser, Book, Loan, User},
};

/// Credential store. Emails are stored normalized and must be unique.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// All users, newest first
    async fn list(&self) -> AppResult<Vec<User>>;

    async fn create(&self, user: &User) -> AppResult<User>;

    async fn update(&self, id: Uuid, changes: &UpdateUser) -> AppResult<User>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

/// Catalog repository. ISBNs must be unique.
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Book>>;

    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>>;

    async fn list(&self) -> AppResult<Vec<Book>>;

    async fn create(&self, book: &Book) -> AppResult<Book>;

    async fn update(&self, id: Uuid, changes: &UpdateBook) -> AppResult<Book>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

/// Loan repository
#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Loan>>;

    /// All loans ordered by loan date
    async fn list(&self) -> AppResult<Vec<Loan>>;

    /// Every loan of one user, open or not, ordered by loan date
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Loan>>;

    async fn list_by_book(&self, book_id: Uuid) -> AppResult<Vec<Loan>>;

    /// Start a checkout unit of work for `(user_id, book_id)`.
    ///
    /// Fails with `Authentication` if the borrower no longer exists.
    ///
    /// Until the returned transaction is committed or dropped, no other
    /// checkout touching the same user or the same book can observe or
    /// modify the loans it reads.
    async fn begin_checkout(&self, user_id: Uuid, book_id: Uuid)
        -> AppResult<Box<dyn CheckoutTx>>;

    /// Set the return date of a loan that is still open.
    ///
    /// Returns `None` when the loan does not exist or was already returned.
    async fn mark_returned(&self, id: Uuid, return_date: DateTime<Utc>)
        -> AppResult<Option<Loan>>;
}

/// Serialized checkout unit of work. Dropping it without `commit` rolls back.
#[async_trait]
pub trait CheckoutTx: Send {
    async fn find_book(&mut self, book_id: Uuid) -> AppResult<Option<Book>>;

    async fn open_loan_for_book(&mut self, book_id: Uuid) -> AppResult<Option<Loan>>;

    async fn open_loan_for_user_book(&mut self, user_id: Uuid, book_id: Uuid)
        -> AppResult<Option<Loan>>;

    async fn count_open_loans(&mut self, user_id: Uuid) -> AppResult<i64>;

    async fn insert(&mut self, loan: &Loan) -> AppResult<Loan>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// Storage handle shared by all services
#[derive(Clone)]
pub struct Repository {
    pub users: Arc<dyn UserStore>,
    pub books: Arc<dyn BookStore>,
    pub loans: Arc<dyn LoanStore>,
}

impl Repository {
    /// Create a repository backed by the given database pool
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            users: Arc::new(users::UsersRepository::new(pool.clone())),
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            loans: Arc::new(loans::LoansRepository::new(pool)),
        }
    }

    /// Create a repository backed by a fresh in-process store
    pub fn in_memory() -> Self {
        let store = memory::MemoryStore::default();
        Self {
            users: Arc::new(store.clone()),
            books: Arc::new(store.clone()),
            loans: Arc::new(store),
        }
    }
}

pub(crate) const EMAIL_TAKEN: &str = "This email is already in use";
pub(crate) const ISBN_TAKEN: &str = "This book already exists";
pub(crate) const BOOK_ON_LOAN: &str = "This book is already on loan";
pub(crate) const USER_HAS_LOANS: &str = "This user has loans on record";
pub(crate) const BOOK_HAS_LOANS: &str = "This book has loans on record";
pub(crate) const BORROWER_GONE: &str = "User not found";

/// Map a unique-constraint violation onto `Conflict`, anything else onto `Database`
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(err),
    }
}

/// Map a foreign-key violation onto `Conflict`, anything else onto `Database`
pub(crate) fn conflict_on_reference(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(err),
    }
}
