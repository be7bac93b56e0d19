//! In-process storage adapter
//!
//! Mirrors the Postgres schema constraints (unique email, unique ISBN,
//! one open loan per book and per user/book pair, loans keep their
//! user and book alive) on top of a single async mutex.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{
    BookStore, CheckoutTx, LoanStore, UserStore, BOOK_HAS_LOANS, BOOK_ON_LOAN, BORROWER_GONE,
    EMAIL_TAKEN, ISBN_TAKEN, USER_HAS_LOANS,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::UpdateBook,
        user::{normalize_email, UpdateUser},
        Book, Loan, User,
    },
};

#[derive(Debug, Default)]
struct MemoryState {
    users: Vec<User>,
    books: Vec<Book>,
    loans: Vec<Loan>,
}

impl MemoryState {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .iter()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn isbn_taken(&self, isbn: &str, except: Option<Uuid>) -> bool {
        self.books
            .iter()
            .any(|b| b.isbn == isbn && Some(b.id) != except)
    }

    fn loans_sorted<F>(&self, filter: F) -> Vec<Loan>
    where
        F: Fn(&Loan) -> bool,
    {
        let mut loans: Vec<Loan> = self.loans.iter().filter(|l| filter(l)).cloned().collect();
        loans.sort_by_key(|l| l.loan_date);
        loans
    }
}

/// Shared in-memory store implementing every storage contract
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = normalize_email(email);
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        let state = self.state.lock().await;
        let mut users = state.users.clone();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn create(&self, user: &User) -> AppResult<User> {
        let mut state = self.state.lock().await;
        let mut user = user.clone();
        user.email = normalize_email(&user.email);

        if state.email_taken(&user.email, None) {
            return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
        }

        state.users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: &UpdateUser) -> AppResult<User> {
        let mut state = self.state.lock().await;
        let email = changes.email.as_deref().map(normalize_email);

        if let Some(ref email) = email {
            if state.email_taken(email, Some(id)) {
                return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
            }
        }

        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::NotFound("User doesn't exist".to_string()))?;

        if let Some(ref name) = changes.name {
            user.name = name.clone();
        }
        if let Some(email) = email {
            user.email = email;
        }

        Ok(user.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut state = self.state.lock().await;

        if !state.users.iter().any(|u| u.id == id) {
            return Err(AppError::NotFound("User doesn't exist".to_string()));
        }
        if state.loans.iter().any(|l| l.user_id == id) {
            return Err(AppError::Conflict(USER_HAS_LOANS.to_string()));
        }

        state.users.retain(|u| u.id != id);
        Ok(())
    }
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        let state = self.state.lock().await;
        Ok(state.books.iter().find(|b| b.id == id).cloned())
    }

    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>> {
        let state = self.state.lock().await;
        Ok(state.books.iter().find(|b| b.isbn == isbn).cloned())
    }

    async fn list(&self) -> AppResult<Vec<Book>> {
        let state = self.state.lock().await;
        let mut books = state.books.clone();
        books.sort_by_key(|b| b.created_at);
        Ok(books)
    }

    async fn create(&self, book: &Book) -> AppResult<Book> {
        let mut state = self.state.lock().await;

        if state.isbn_taken(&book.isbn, None) {
            return Err(AppError::Conflict(ISBN_TAKEN.to_string()));
        }

        state.books.push(book.clone());
        Ok(book.clone())
    }

    async fn update(&self, id: Uuid, changes: &UpdateBook) -> AppResult<Book> {
        let mut state = self.state.lock().await;

        if let Some(ref isbn) = changes.isbn {
            if state.isbn_taken(isbn, Some(id)) {
                return Err(AppError::Conflict(ISBN_TAKEN.to_string()));
            }
        }

        let book = state
            .books
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| AppError::NotFound("This book doesn't exist".to_string()))?;

        changes.apply_to(book);
        Ok(book.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut state = self.state.lock().await;

        if !state.books.iter().any(|b| b.id == id) {
            return Err(AppError::NotFound("This book doesn't exist".to_string()));
        }
        if state.loans.iter().any(|l| l.book_id == id) {
            return Err(AppError::Conflict(BOOK_HAS_LOANS.to_string()));
        }

        state.books.retain(|b| b.id != id);
        Ok(())
    }
}

#[async_trait]
impl LoanStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Loan>> {
        let state = self.state.lock().await;
        Ok(state.loans.iter().find(|l| l.id == id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<Loan>> {
        let state = self.state.lock().await;
        Ok(state.loans_sorted(|_| true))
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Loan>> {
        let state = self.state.lock().await;
        Ok(state.loans_sorted(|l| l.user_id == user_id))
    }

    async fn list_by_book(&self, book_id: Uuid) -> AppResult<Vec<Loan>> {
        let state = self.state.lock().await;
        Ok(state.loans_sorted(|l| l.book_id == book_id))
    }

    async fn begin_checkout(
        &self,
        user_id: Uuid,
        _book_id: Uuid,
    ) -> AppResult<Box<dyn CheckoutTx>> {
        // Holding the whole store serializes every checkout, which is
        // stricter than the per-user/per-book locking Postgres does.
        let state = self.state.clone().lock_owned().await;
        if !state.users.iter().any(|u| u.id == user_id) {
            return Err(AppError::Authentication(BORROWER_GONE.to_string()));
        }
        Ok(Box::new(MemoryCheckout {
            state,
            pending: Vec::new(),
        }))
    }

    async fn mark_returned(
        &self,
        id: Uuid,
        return_date: DateTime<Utc>,
    ) -> AppResult<Option<Loan>> {
        let mut state = self.state.lock().await;
        let loan = state
            .loans
            .iter_mut()
            .find(|l| l.id == id && l.return_date.is_none());

        Ok(loan.map(|l| {
            l.return_date = Some(return_date);
            l.clone()
        }))
    }
}

/// Checkout holding the store lock; inserts stay pending until commit
struct MemoryCheckout {
    state: OwnedMutexGuard<MemoryState>,
    pending: Vec<Loan>,
}

impl MemoryCheckout {
    fn visible_loans(&self) -> impl Iterator<Item = &Loan> {
        self.state.loans.iter().chain(self.pending.iter())
    }
}

#[async_trait]
impl CheckoutTx for MemoryCheckout {
    async fn find_book(&mut self, book_id: Uuid) -> AppResult<Option<Book>> {
        Ok(self.state.books.iter().find(|b| b.id == book_id).cloned())
    }

    async fn open_loan_for_book(&mut self, book_id: Uuid) -> AppResult<Option<Loan>> {
        Ok(self
            .visible_loans()
            .find(|l| l.book_id == book_id && l.is_open())
            .cloned())
    }

    async fn open_loan_for_user_book(
        &mut self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> AppResult<Option<Loan>> {
        Ok(self
            .visible_loans()
            .find(|l| l.user_id == user_id && l.book_id == book_id && l.is_open())
            .cloned())
    }

    async fn count_open_loans(&mut self, user_id: Uuid) -> AppResult<i64> {
        Ok(self
            .visible_loans()
            .filter(|l| l.user_id == user_id && l.is_open())
            .count() as i64)
    }

    async fn insert(&mut self, loan: &Loan) -> AppResult<Loan> {
        if loan.is_open()
            && self
                .visible_loans()
                .any(|l| l.book_id == loan.book_id && l.is_open())
        {
            return Err(AppError::Conflict(BOOK_ON_LOAN.to_string()));
        }

        self.pending.push(loan.clone());
        Ok(loan.clone())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryCheckout { mut state, pending } = *self;
        state.loans.extend(pending);
        Ok(())
    }
}
