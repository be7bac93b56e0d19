//! Book (catalog) endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        book::{CreateBook, UpdateBook},
        Book, BookDetails,
    },
};

use super::{parse_id, ApiResponse, TeacherUser, ValidatedJson};

/// List all books with their loans
#[utoipa::path(
    get,
    path = "/api/books",
    tag = "books",
    responses(
        (status = 200, description = "All books", body = Vec<BookDetails>)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
) -> AppResult<Json<ApiResponse<Vec<BookDetails>>>> {
    let books = state.services.catalog.list_books().await?;
    Ok(ApiResponse::new(books, "All books"))
}

/// Get one book with its loans
#[utoipa::path(
    get,
    path = "/api/books/{id}",
    tag = "books",
    params(
        ("id" = String, Path, description = "Book ID (UUID)")
    ),
    responses(
        (status = 200, description = "Book found", body = BookDetails),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<BookDetails>>> {
    let book = state.services.catalog.get_book(parse_id(&id)?).await?;
    Ok(ApiResponse::new(book, "Book found"))
}

/// Add a book to the catalog (teacher only)
#[utoipa::path(
    post,
    path = "/api/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid data"),
        (status = 401, description = "Not authenticated or not a teacher"),
        (status = 409, description = "ISBN already in the catalog")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    TeacherUser(_teacher): TeacherUser,
    ValidatedJson(request): ValidatedJson<CreateBook>,
) -> AppResult<(StatusCode, Json<ApiResponse<Book>>)> {
    let book = state.services.catalog.create_book(request).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::new(book, "Book created successfully"),
    ))
}

/// Edit a book (teacher only)
#[utoipa::path(
    put,
    path = "/api/books/edit/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Book ID (UUID)")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = BookDetails),
        (status = 401, description = "Not authenticated or not a teacher"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "ISBN already in the catalog")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    TeacherUser(_teacher): TeacherUser,
    Path(id): Path<String>,
    ValidatedJson(changes): ValidatedJson<UpdateBook>,
) -> AppResult<Json<ApiResponse<BookDetails>>> {
    let book = state.services.catalog.update_book(parse_id(&id)?, changes).await?;
    Ok(ApiResponse::new(book, "Book updated successfully"))
}

/// Remove a book (teacher only)
#[utoipa::path(
    delete,
    path = "/api/books/delete/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Book ID (UUID)")
    ),
    responses(
        (status = 200, description = "Book removed"),
        (status = 401, description = "Not authenticated or not a teacher"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book has loans on record")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    TeacherUser(_teacher): TeacherUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Option<()>>>> {
    state.services.catalog.delete_book(parse_id(&id)?).await?;
    Ok(ApiResponse::new(None, "Book removed successfully"))
}
