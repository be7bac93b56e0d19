//! Catalog management service

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{CreateBook, UpdateBook},
        Book, BookDetails, Loan,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// All books, each with the loans that reference it
    pub async fn list_books(&self) -> AppResult<Vec<BookDetails>> {
        let books = self.repository.books.list().await?;

        let mut by_book: HashMap<Uuid, Vec<Loan>> = HashMap::new();
        for loan in self.repository.loans.list().await? {
            by_book.entry(loan.book_id).or_default().push(loan);
        }

        Ok(books
            .into_iter()
            .map(|book| {
                let loans = by_book.remove(&book.id).unwrap_or_default();
                BookDetails { book, loans }
            })
            .collect())
    }

    /// One book with its loans
    pub async fn get_book(&self, id: Uuid) -> AppResult<BookDetails> {
        let book = self
            .repository
            .books
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("This book doesn't exist".to_string()))?;
        let loans = self.repository.loans.list_by_book(id).await?;

        Ok(BookDetails { book, loans })
    }

    /// Look a book up by ISBN
    pub async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>> {
        self.repository.books.find_by_isbn(isbn).await
    }

    /// Add a book to the catalog; ISBNs are unique
    pub async fn create_book(&self, request: CreateBook) -> AppResult<Book> {
        if self.find_by_isbn(&request.isbn).await?.is_some() {
            return Err(AppError::Conflict("This book already exists".to_string()));
        }

        let book = Book {
            id: Uuid::new_v4(),
            author: request.author,
            title: request.title,
            category: request.category,
            isbn: request.isbn,
            created_at: Utc::now(),
        };

        let created = self.repository.books.create(&book).await?;
        tracing::info!("Catalog: created book {} (isbn {})", created.id, created.isbn);
        Ok(created)
    }

    /// Edit the supplied fields of a book
    pub async fn update_book(&self, id: Uuid, changes: UpdateBook) -> AppResult<BookDetails> {
        if let Some(ref isbn) = changes.isbn {
            if let Some(other) = self.find_by_isbn(isbn).await? {
                if other.id != id {
                    return Err(AppError::Conflict("This book already exists".to_string()));
                }
            }
        }

        let book = self.repository.books.update(id, &changes).await?;
        let loans = self.repository.loans.list_by_book(id).await?;
        Ok(BookDetails { book, loans })
    }

    /// Remove a book. Books with loan history are kept.
    pub async fn delete_book(&self, id: Uuid) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!("Catalog: deleted book {}", id);
        Ok(())
    }
}
