//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{conflict_on_reference, conflict_on_unique, BookStore, BOOK_HAS_LOANS, ISBN_TAKEN};
use crate::{
    error::{AppError, AppResult},
    models::book::{Book, UpdateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(book)
    }

    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE isbn = $1")
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?;

        Ok(book)
    }

    async fn list(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;

        Ok(books)
    }

    async fn create(&self, book: &Book) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (id, author, title, category, isbn, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(book.id)
        .bind(&book.author)
        .bind(&book.title)
        .bind(&book.category)
        .bind(&book.isbn)
        .bind(book.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, ISBN_TAKEN))
    }

    async fn update(&self, id: Uuid, changes: &UpdateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET author = COALESCE($2, author),
                title = COALESCE($3, title),
                category = COALESCE($4, category),
                isbn = COALESCE($5, isbn)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.author.as_deref())
        .bind(changes.title.as_deref())
        .bind(changes.category.as_deref())
        .bind(changes.isbn.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, ISBN_TAKEN))?
        .ok_or_else(|| AppError::NotFound("This book doesn't exist".to_string()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_reference(e, BOOK_HAS_LOANS))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("This book doesn't exist".to_string()));
        }

        Ok(())
    }
}
